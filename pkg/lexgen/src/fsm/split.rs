use crate::algorithms::DisjointSets;
use crate::graph::Graph;

/// Splits a graph into its weakly connected components.
///
/// Components are returned ordered by the position of their first state.
/// Within each component states keep their relative order and transitions
/// keep the order in which they were added. A graph which is already a single
/// component (or is empty) is returned as is.
pub fn split_distinct_graphs<N, T>(graph: Graph<N, T>) -> Vec<Graph<N, T>> {
    let num_states = graph.num_states();

    let mut sets = DisjointSets::new(num_states);
    for t in graph.transitions() {
        let (from, to) = match (graph.position(t.from()), graph.position(t.to())) {
            (Some(from), Some(to)) => (from, to),
            _ => continue,
        };

        sets.union_sets(from, to);
    }

    let groups = sets.groups();
    if groups.len() <= 1 {
        trace!("Graph with {} states is already connected", num_states);
        return vec![graph];
    }

    debug!(
        "Splitting graph with {} states into {} components",
        num_states,
        groups.len()
    );

    // position -> component index
    let mut component = vec![0; num_states];
    for (i, group) in groups.iter().enumerate() {
        for pos in group {
            component[*pos] = i;
        }
    }

    let mut outputs: Vec<Graph<N, T>> = (0..groups.len()).map(|_| Graph::new()).collect();

    let (states, transitions) = graph.into_parts();

    // Old state index -> (component, new id). into_parts() returns live states
    // in order so the i'th entry is at position i.
    let mut mapping = vec![None; states.last().map(|(id, _, _)| id.index() + 1).unwrap_or(0)];
    for (pos, (id, is_start, label)) in states.into_iter().enumerate() {
        let c = component[pos];
        let new_id = outputs[c].builder().new_state(is_start, label);
        mapping[id.index()] = Some((c, new_id));
    }

    for (from, to, label) in transitions {
        let (c, new_from, new_to) = match (mapping[from.index()], mapping[to.index()]) {
            (Some((c, new_from)), Some((_, new_to))) => (c, new_from, new_to),
            _ => continue,
        };

        outputs[c]
            .builder()
            .add_transition(new_from, new_to, label)
            .expect("Both endpoints were created in this component");
    }

    outputs
}
