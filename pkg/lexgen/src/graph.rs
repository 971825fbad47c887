// Generic directed multigraph used to represent both the NFAs and DFAs.
//
// States and transitions live in arenas owned by the Graph and refer to each
// other by index. Deleted entries stay in the arenas (marked as deleted) so
// that ids handed out earlier never get reused within a graph.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::GraphError;

/// Source of unique graph identities so that ids from one graph can't be used
/// with another.
static NEXT_GRAPH_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StateId {
    graph: usize,
    index: usize,
}

impl StateId {
    /// Position of the state in its graph's arena. States created later always
    /// have larger indices.
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TransitionId {
    graph: usize,
    index: usize,
}

impl TransitionId {
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug)]
pub struct State<N> {
    id: StateId,
    label: N,
    is_start: bool,
    outgoing: Vec<TransitionId>,
    incoming: Vec<TransitionId>,
    deleted: bool,
}

impl<N> State<N> {
    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn label(&self) -> &N {
        &self.label
    }

    pub fn is_start(&self) -> bool {
        self.is_start
    }

    pub fn outgoing(&self) -> &[TransitionId] {
        &self.outgoing
    }

    pub fn incoming(&self) -> &[TransitionId] {
        &self.incoming
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

#[derive(Debug)]
pub struct Transition<T> {
    id: TransitionId,
    label: T,
    from: StateId,
    to: StateId,
    deleted: bool,
}

impl<T> Transition<T> {
    pub fn id(&self) -> TransitionId {
        self.id
    }

    pub fn label(&self) -> &T {
        &self.label
    }

    pub fn from(&self) -> StateId {
        self.from
    }

    pub fn to(&self) -> StateId {
        self.to
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

/// Directed graph with labeled states (N) and labeled transitions (T).
///
/// Only a GraphBuilder can modify the graph.
#[derive(Debug)]
pub struct Graph<N, T> {
    id: usize,
    states: Vec<State<N>>,
    transitions: Vec<Transition<T>>,

    /// All live states in creation order.
    state_list: Vec<StateId>,

    /// All live start states in creation order.
    start_states: Vec<StateId>,
}

impl<N, T> Default for Graph<N, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, T> Graph<N, T> {
    pub fn new() -> Self {
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            states: vec![],
            transitions: vec![],
            state_list: vec![],
            start_states: vec![],
        }
    }

    pub fn builder(&mut self) -> GraphBuilder<N, T> {
        GraphBuilder { graph: self }
    }

    /// All live states in creation order.
    pub fn states(&self) -> &[StateId] {
        &self.state_list
    }

    /// All live start states in creation order.
    pub fn start_states(&self) -> &[StateId] {
        &self.start_states
    }

    pub fn num_states(&self) -> usize {
        self.state_list.len()
    }

    pub fn owns_state(&self, id: StateId) -> bool {
        id.graph == self.id && id.index < self.states.len()
    }

    pub fn owns_transition(&self, id: TransitionId) -> bool {
        id.graph == self.id && id.index < self.transitions.len()
    }

    /// Looks up a state. Panics if the id was created by a different graph.
    pub fn state(&self, id: StateId) -> &State<N> {
        assert!(self.owns_state(id), "State {:?} used with the wrong graph", id);
        &self.states[id.index]
    }

    /// Looks up a transition. Panics if the id was created by a different
    /// graph.
    pub fn transition(&self, id: TransitionId) -> &Transition<T> {
        assert!(
            self.owns_transition(id),
            "Transition {:?} used with the wrong graph",
            id
        );
        &self.transitions[id.index]
    }

    /// All live transitions in creation order.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition<T>> {
        self.transitions.iter().filter(|t| !t.deleted)
    }

    pub fn outgoing(&self, id: StateId) -> impl Iterator<Item = &Transition<T>> {
        self.state(id)
            .outgoing
            .iter()
            .map(move |t| &self.transitions[t.index])
    }

    pub fn incoming(&self, id: StateId) -> impl Iterator<Item = &Transition<T>> {
        self.state(id)
            .incoming
            .iter()
            .map(move |t| &self.transitions[t.index])
    }

    /// Position of a live state in states(). This is the dense numbering used
    /// when the graph is serialized into tables.
    pub fn position(&self, id: StateId) -> Option<usize> {
        if !self.owns_state(id) {
            return None;
        }

        // state_list stays sorted by index as states are only appended.
        self.state_list
            .binary_search_by_key(&id.index, |s| s.index)
            .ok()
    }

    /// Takes apart the graph, returning the live state and transition data.
    /// States are returned in creation order as (id, is_start, label) and
    /// transitions as (from, to, label).
    pub(crate) fn into_parts(self) -> (Vec<(StateId, bool, N)>, Vec<(StateId, StateId, T)>) {
        let states = self
            .states
            .into_iter()
            .filter(|s| !s.deleted)
            .map(|s| (s.id, s.is_start, s.label))
            .collect();

        let transitions = self
            .transitions
            .into_iter()
            .filter(|t| !t.deleted)
            .map(|t| (t.from, t.to, t.label))
            .collect();

        (states, transitions)
    }
}

/// Mutable access to a single Graph.
pub struct GraphBuilder<'a, N, T> {
    graph: &'a mut Graph<N, T>,
}

impl<'a, N, T> GraphBuilder<'a, N, T> {
    /// Read-only view of the graph being built.
    pub fn graph(&self) -> &Graph<N, T> {
        self.graph
    }

    pub fn new_state(&mut self, is_start: bool, label: N) -> StateId {
        let id = StateId {
            graph: self.graph.id,
            index: self.graph.states.len(),
        };

        self.graph.states.push(State {
            id,
            label,
            is_start,
            outgoing: vec![],
            incoming: vec![],
            deleted: false,
        });

        self.graph.state_list.push(id);
        if is_start {
            self.graph.start_states.push(id);
        }

        id
    }

    pub fn add_transition(
        &mut self,
        from: StateId,
        to: StateId,
        label: T,
    ) -> Result<TransitionId, GraphError> {
        self.check_state(from)?;
        self.check_state(to)?;

        let id = TransitionId {
            graph: self.graph.id,
            index: self.graph.transitions.len(),
        };

        self.graph.transitions.push(Transition {
            id,
            label,
            from,
            to,
            deleted: false,
        });

        self.graph.states[from.index].outgoing.push(id);
        self.graph.states[to.index].incoming.push(id);

        Ok(id)
    }

    /// Adds a transition carrying the default label. For NFAs this is an
    /// epsilon transition.
    pub fn add_unlabeled_transition(
        &mut self,
        from: StateId,
        to: StateId,
    ) -> Result<TransitionId, GraphError>
    where
        T: Default,
    {
        self.add_transition(from, to, T::default())
    }

    pub fn label_mut(&mut self, id: StateId) -> Result<&mut N, GraphError> {
        self.check_state(id)?;
        Ok(&mut self.graph.states[id.index].label)
    }

    /// Deletes a state along with every transition entering or leaving it.
    pub fn delete_state(&mut self, id: StateId) -> Result<(), GraphError> {
        self.check_state(id)?;

        let state = &mut self.graph.states[id.index];
        let mut incident = std::mem::replace(&mut state.outgoing, vec![]);
        incident.extend(std::mem::replace(&mut state.incoming, vec![]));

        for t in incident {
            // Self loops are listed twice.
            if !self.graph.transitions[t.index].deleted {
                self.unlink_transition(t);
            }
        }

        self.graph.states[id.index].deleted = true;
        self.graph.state_list.retain(|s| *s != id);
        self.graph.start_states.retain(|s| *s != id);

        Ok(())
    }

    pub fn delete_transition(&mut self, id: TransitionId) -> Result<(), GraphError> {
        if !self.graph.owns_transition(id) {
            return Err(GraphError::ForeignTransition { index: id.index });
        }
        if self.graph.transitions[id.index].deleted {
            return Err(GraphError::DeletedTransition { index: id.index });
        }

        self.unlink_transition(id);
        Ok(())
    }

    fn unlink_transition(&mut self, id: TransitionId) {
        let (from, to) = {
            let t = &mut self.graph.transitions[id.index];
            t.deleted = true;
            (t.from, t.to)
        };

        self.graph.states[from.index].outgoing.retain(|t| *t != id);
        self.graph.states[to.index].incoming.retain(|t| *t != id);
    }

    fn check_state(&self, id: StateId) -> Result<(), GraphError> {
        if !self.graph.owns_state(id) {
            return Err(GraphError::ForeignState { index: id.index });
        }
        if self.graph.states[id.index].deleted {
            return Err(GraphError::DeletedState { index: id.index });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_inspect() {
        let mut g = Graph::<&str, char>::new();
        let mut b = g.builder();
        let s0 = b.new_state(true, "s0");
        let s1 = b.new_state(false, "s1");
        let s2 = b.new_state(true, "s2");
        let t01 = b.add_transition(s0, s1, 'a').unwrap();
        b.add_transition(s1, s2, 'b').unwrap();
        b.add_transition(s1, s1, 'c').unwrap();

        assert_eq!(g.states(), &[s0, s1, s2]);
        assert_eq!(g.start_states(), &[s0, s2]);
        assert_eq!(*g.state(s1).label(), "s1");
        assert_eq!(g.transition(t01).to(), s1);

        let out: Vec<char> = g.outgoing(s1).map(|t| *t.label()).collect();
        assert_eq!(out, vec!['b', 'c']);
        let inc: Vec<char> = g.incoming(s1).map(|t| *t.label()).collect();
        assert_eq!(inc, vec!['a', 'c']);
        assert_eq!(g.position(s2), Some(2));
    }

    #[test]
    fn deleting_state_removes_incident_transitions() {
        let mut g = Graph::<u32, char>::new();
        let mut b = g.builder();
        let s0 = b.new_state(true, 0);
        let s1 = b.new_state(false, 1);
        let s2 = b.new_state(false, 2);
        b.add_transition(s0, s1, 'a').unwrap();
        b.add_transition(s1, s1, 'b').unwrap();
        b.add_transition(s1, s2, 'c').unwrap();
        b.add_transition(s0, s2, 'd').unwrap();

        b.delete_state(s1).unwrap();
        assert_eq!(b.delete_state(s1), Err(GraphError::DeletedState { index: 1 }));

        assert_eq!(g.states(), &[s0, s2]);
        assert_eq!(g.position(s2), Some(1));
        assert_eq!(g.position(s1), None);
        assert!(g.state(s1).is_deleted());

        let labels: Vec<char> = g.transitions().map(|t| *t.label()).collect();
        assert_eq!(labels, vec!['d']);
        assert_eq!(g.state(s0).outgoing().len(), 1);
        assert_eq!(g.state(s2).incoming().len(), 1);
    }

    #[test]
    fn deleting_transition() {
        let mut g = Graph::<(), Option<char>>::new();
        let mut b = g.builder();
        let s0 = b.new_state(true, ());
        let s1 = b.new_state(false, ());
        let t = b.add_unlabeled_transition(s0, s1).unwrap();
        b.delete_transition(t).unwrap();
        assert_eq!(
            b.delete_transition(t),
            Err(GraphError::DeletedTransition { index: 0 })
        );

        assert!(g.state(s0).outgoing().is_empty());
        assert!(g.state(s1).incoming().is_empty());
        assert_eq!(g.transitions().count(), 0);
    }

    #[test]
    fn foreign_ids_are_rejected() {
        let mut g1 = Graph::<(), ()>::new();
        let mut g2 = Graph::<(), ()>::new();
        let a = g1.builder().new_state(true, ());

        let mut b = g2.builder();
        let x = b.new_state(true, ());
        assert_eq!(
            b.add_transition(x, a, ()),
            Err(GraphError::ForeignState { index: 0 })
        );
        assert_eq!(b.delete_state(a), Err(GraphError::ForeignState { index: 0 }));

        let t = g1.builder().add_transition(a, a, ()).unwrap();
        assert_eq!(
            g2.builder().delete_transition(t),
            Err(GraphError::ForeignTransition { index: 0 })
        );
        assert!(!g2.owns_state(a));
    }

    #[test]
    fn relabel_while_building() {
        let mut g = Graph::<u32, char>::new();
        let mut b = g.builder();
        let s0 = b.new_state(true, 1);
        let s1 = b.new_state(false, 2);
        b.add_transition(s0, s1, 'x').unwrap();

        assert_eq!(b.graph().num_states(), 2);
        assert_eq!(*b.graph().state(s1).label(), 2);

        *b.label_mut(s1).unwrap() += 10;
        assert_eq!(*b.graph().state(s1).label(), 12);

        b.delete_state(s0).unwrap();
        assert_eq!(b.label_mut(s0), Err(GraphError::DeletedState { index: 0 }));
        assert_eq!(b.graph().transitions().count(), 0);

        let mut other = Graph::<u32, char>::new();
        let foreign = other.builder().new_state(false, 0);
        assert_eq!(
            b.label_mut(foreign).map(|l| *l),
            Err(GraphError::ForeignState { index: 0 })
        );

        assert_eq!(g.states(), &[s1]);
    }
}
