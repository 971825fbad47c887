use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::charset::CharSet;
use crate::fsm::alphabet::partition;
use crate::fsm::{Dfa, Nfa, NodeData};
use crate::graph::StateId;

/// Positions (in nfa.states()) of a set of NFA states. Always sorted.
type StateSet = Vec<usize>;

/// Per state information about an NFA needed during the powerset construction.
struct NfaInfo<'a> {
    nfa: &'a Nfa,

    /// Epsilon closure of every state.
    closures: Vec<StateSet>,

    /// Whether a state affects the behavior of any set containing it: it
    /// either accepts or has at least one non-epsilon transition. States that
    /// only have epsilon transitions are already represented by their
    /// closures.
    significant: Vec<bool>,
}

impl<'a> NfaInfo<'a> {
    fn new(nfa: &'a Nfa) -> Self {
        let states = nfa.states();

        let mut epsilons = vec![vec![]; states.len()];
        let mut significant = vec![false; states.len()];
        for (i, id) in states.iter().enumerate() {
            significant[i] = nfa.state(*id).label().is_terminal();
            for t in nfa.outgoing(*id) {
                match t.label() {
                    Some(_) => significant[i] = true,
                    None => {
                        if let Some(j) = nfa.position(t.to()) {
                            epsilons[i].push(j);
                        }
                    }
                }
            }
        }

        let closures: Vec<StateSet> = (0..states.len())
            .map(|i| {
                let mut seen = BTreeSet::new();
                seen.insert(i);
                let mut stack = vec![i];
                while let Some(j) = stack.pop() {
                    for k in epsilons[j].iter() {
                        if seen.insert(*k) {
                            stack.push(*k);
                        }
                    }
                }

                seen.into_iter().collect::<StateSet>()
            })
            .collect();

        Self {
            nfa,
            closures,
            significant,
        }
    }

    fn label(&self, i: usize) -> &NodeData {
        self.nfa.state(self.nfa.states()[i]).label()
    }

    /// Key identifying the DFA state for a closed set of NFA states.
    fn key<I: IntoIterator<Item = usize>>(&self, closed_set: I) -> StateSet {
        closed_set
            .into_iter()
            .filter(|i| self.significant[*i])
            .collect()
    }

    /// Smallest start index among the NFA start states in a closed set.
    fn start_index<'b, I: IntoIterator<Item = &'b usize>>(&self, closed_set: I) -> Option<usize> {
        closed_set
            .into_iter()
            .filter(|i| self.nfa.state(self.nfa.states()[**i]).is_start())
            .filter_map(|i| self.label(*i).start_index)
            .min()
    }

    /// Provenance of the DFA state representing the given key. If multiple
    /// rules accept, the one with the lowest priority (then rule index) wins.
    fn node_data(&self, key: &[usize], start_index: Option<usize>) -> NodeData {
        let mut data = NodeData::default();

        let winner = key
            .iter()
            .map(|i| self.label(*i))
            .filter_map(|l| l.precedence().map(|p| (p, l)))
            .min_by_key(|(p, _)| *p);
        if let Some((_, l)) = winner {
            data.end_index = l.end_index;
            data.priority = l.priority;
        }

        data.start_index = start_index;
        data
    }
}

/// Converts an NFA into an equivalent DFA using the powerset construction.
///
/// Each start state of the NFA becomes a start state of the DFA (unless it is
/// indistinguishable from an earlier one). Accepting DFA states carry the
/// rule with the lowest priority among all NFA accept states they represent.
///
/// The output only depends on the structure of the NFA: DFA states are
/// created in breadth first order from the start states (sorted by start
/// index) following transitions in order of their smallest character.
///
/// NOTE: No dead state is created. A character with no transition out of a
/// state is rejected.
pub fn create_dfa(nfa: &Nfa) -> Dfa {
    let info = NfaInfo::new(nfa);
    let states = nfa.states();

    let mut dfa = Dfa::new();
    let mut builder = dfa.builder();

    let mut known = HashMap::<StateSet, StateId>::new();
    let mut queue = VecDeque::<(StateSet, StateId)>::new();

    let mut seeds = nfa
        .start_states()
        .iter()
        .filter_map(|id| nfa.position(*id))
        .collect::<Vec<_>>();
    seeds.sort_by_key(|i| (info.label(*i).start_index.unwrap_or(usize::MAX), *i));

    for seed in seeds {
        let key = info.key(info.closures[seed].iter().cloned());
        if let Some(existing) = known.get(&key) {
            debug!(
                "NFA start state {} shares DFA start state {}",
                seed,
                existing.index()
            );
            continue;
        }

        let data = info.node_data(&key, info.label(seed).start_index);
        let id = builder.new_state(true, data);
        known.insert(key.clone(), id);
        queue.push_back((key, id));
    }

    while let Some((key, id)) = queue.pop_front() {
        // All non-epsilon transitions out of this set as (label, target).
        let mut moves: Vec<(&CharSet, usize)> = vec![];
        for i in key.iter() {
            for t in nfa.outgoing(states[*i]) {
                if let (Some(label), Some(to)) = (t.label(), nfa.position(t.to())) {
                    moves.push((label, to));
                }
            }
        }

        // Classes that reach the same set of targets are merged into a single
        // transition. Entries are (target key, start index, label).
        let mut groups: Vec<(StateSet, Option<usize>, CharSet)> = vec![];
        let mut group_index = HashMap::<StateSet, usize>::new();
        for class in partition(moves.iter().map(|(label, _)| *label)) {
            let mut targets = BTreeSet::new();
            for (label, to) in moves.iter() {
                if label.intersects(&class) {
                    targets.extend(info.closures[*to].iter().cloned());
                }
            }

            let target_key = info.key(targets.iter().cloned());
            if target_key.is_empty() {
                continue;
            }

            let start_index = info.start_index(targets.iter());

            match group_index.get(&target_key) {
                Some(g) => {
                    let group = &mut groups[*g];
                    group.1 = min_option(group.1, start_index);
                    group.2 = group.2.union(&class);
                }
                None => {
                    group_index.insert(target_key.clone(), groups.len());
                    groups.push((target_key, start_index, class));
                }
            }
        }

        trace!(
            "DFA state {} ({} NFA states) has {} transitions",
            id.index(),
            key.len(),
            groups.len()
        );

        for (target_key, start_index, label) in groups {
            let target = match known.get(&target_key) {
                Some(target) => *target,
                None => {
                    let target = builder.new_state(false, info.node_data(&target_key, start_index));
                    known.insert(target_key.clone(), target);
                    queue.push_back((target_key, target));
                    target
                }
            };

            builder
                .add_transition(id, target, label)
                .expect("DFA states are created by this builder");
        }
    }

    debug!(
        "Converted NFA with {} states into DFA with {} states",
        nfa.num_states(),
        dfa.num_states()
    );

    dfa
}

fn min_option(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::fsm::testing::*;
    use crate::regexp::RegExpNode;

    #[test]
    fn dollar_loop_collapses_to_one_state() {
        let nfa = build_nfa(&[&["(\\$|[bob\\$])*"]]);
        let dfa = create_dfa(&nfa);

        let accepting: Vec<_> = dfa
            .states()
            .iter()
            .filter(|s| dfa.state(**s).label().is_terminal())
            .cloned()
            .collect();
        assert_eq!(accepting.len(), 1);

        let s = accepting[0];
        let out: Vec<_> = dfa.outgoing(s).collect();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to(), s);
        assert_eq!(out[0].label().to_string(), "[$,b,o]");
        assert_eq!(dfa.state(s).label().end_index, Some(0));
    }

    #[test]
    fn earlier_rule_wins() {
        // Keywords declared before identifiers.
        let nfa = build_nfa(&[&["if", "[a-z]+"]]);
        let dfa = create_dfa(&nfa);
        let start = dfa.start_states()[0];
        assert_eq!(run(&dfa, start, "if"), Some(0));
        assert_eq!(run(&dfa, start, "i"), Some(1));
        assert_eq!(run(&dfa, start, "iff"), Some(1));

        // Identifiers declared first shadow the keyword.
        let nfa = build_nfa(&[&["[a-z]+", "if"]]);
        let dfa = create_dfa(&nfa);
        let start = dfa.start_states()[0];
        assert_eq!(run(&dfa, start, "if"), Some(0));
        assert_eq!(run(&dfa, start, "x"), Some(0));
    }

    #[test]
    fn transitions_are_deterministic() {
        let nfa = build_nfa(&[&["[a-z]+", "[a-f0-9]+", "0x[0-9a-f]+", ".", "\"([^\"\\\\]|\\\\.)*\""]]);
        let dfa = create_dfa(&nfa);

        for s in dfa.states() {
            let labels: Vec<&CharSet> = dfa.outgoing(*s).map(|t| t.label()).collect();
            for (i, a) in labels.iter().enumerate() {
                assert!(!a.is_empty());
                for b in labels[(i + 1)..].iter() {
                    assert!(!a.intersects(b), "{} overlaps {}", a, b);
                }
            }
        }

        let start = dfa.start_states()[0];
        assert_eq!(run(&dfa, start, "0x1f"), Some(2));
        assert_eq!(run(&dfa, start, "beef"), Some(0));
        assert_eq!(run(&dfa, start, "0"), Some(1));
        assert_eq!(run(&dfa, start, "#"), Some(3));
        assert_eq!(run(&dfa, start, "\"a\\\"b\""), Some(4));
        assert_eq!(run(&dfa, start, "\"a"), None);
        assert_eq!(run(&dfa, start, "\n"), None);
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let rules = ["ab*c", "a[bc]", "(b|c)+"];
        let nodes: Vec<RegExpNode> = rules.iter().map(|r| RegExpNode::parse(r).unwrap()).collect();

        let forward = {
            let mut nfa = Nfa::new();
            let mut b = nfa.builder();
            let start = b.new_state(true, NodeData::start(0));
            for (i, node) in nodes.iter().enumerate() {
                let end = b.new_state(false, NodeData::end(i, i));
                node.generate_nfa(&mut b, start, end).unwrap();
            }
            nfa
        };

        let backward = {
            let mut nfa = Nfa::new();
            let mut b = nfa.builder();
            // Some unrelated junk which gets deleted.
            let junk = b.new_state(false, NodeData::default());
            let mut ends = vec![];
            for i in (0..nodes.len()).rev() {
                ends.push((i, b.new_state(false, NodeData::end(i, i))));
            }
            let start = b.new_state(true, NodeData::start(0));
            b.add_unlabeled_transition(junk, start).unwrap();
            for (i, end) in ends {
                nodes[i].generate_nfa(&mut b, start, end).unwrap();
            }
            b.delete_state(junk).unwrap();
            nfa
        };

        let a = create_dfa(&forward);
        let b = create_dfa(&backward);
        assert_eq!(signature(&a), signature(&b));
        assert_eq!(signature(&a), signature(&create_dfa(&forward)));
    }

    #[test]
    fn one_start_per_entry_point() {
        let nfa = build_nfa(&[&["a+"], &["b", "a"]]);
        let dfa = create_dfa(&nfa);

        let starts = dfa.start_states();
        assert_eq!(starts.len(), 2);
        assert_eq!(dfa.state(starts[0]).label().start_index, Some(0));
        assert_eq!(dfa.state(starts[1]).label().start_index, Some(1));

        assert_eq!(run(&dfa, starts[0], "aaa"), Some(0));
        assert_eq!(run(&dfa, starts[0], "b"), None);
        assert_eq!(run(&dfa, starts[1], "b"), Some(1));
        assert_eq!(run(&dfa, starts[1], "a"), Some(2));
        assert_eq!(run(&dfa, starts[1], "aa"), None);
    }

    #[test]
    fn epsilon_cycles_terminate() {
        let mut nfa = Nfa::new();
        let mut b = nfa.builder();
        let s0 = b.new_state(true, NodeData::start(0));
        let s1 = b.new_state(false, NodeData::default());
        let s2 = b.new_state(false, NodeData::end(0, 0));
        b.add_unlabeled_transition(s0, s1).unwrap();
        b.add_unlabeled_transition(s1, s0).unwrap();
        b.add_unlabeled_transition(s1, s1).unwrap();
        b.add_transition(s1, s2, Some(CharSet::from_char('x'))).unwrap();
        b.add_unlabeled_transition(s2, s0).unwrap();

        let dfa = create_dfa(&nfa);
        let start = dfa.start_states()[0];
        assert_eq!(run(&dfa, start, ""), None);
        assert_eq!(run(&dfa, start, "xxx"), Some(0));

        // After 'x' the closure loops back through s0.
        assert_eq!(dfa.num_states(), 2);
        let next = dfa.outgoing(start).next().unwrap().to();
        assert!(!dfa.state(next).is_start());
        assert_eq!(dfa.state(next).label().start_index, Some(0));
        assert!(dfa.state(next).label().is_terminal());
    }

    #[test]
    fn only_states_reached_through_a_start_have_a_start_index() {
        let dfa = create_dfa(&build_nfa(&[&["ab"]]));
        assert_eq!(dfa.num_states(), 3);
        for (i, s) in dfa.states().iter().enumerate() {
            let expected = if i == 0 { Some(0) } else { None };
            assert_eq!(dfa.state(*s).label().start_index, expected);
        }
    }

    #[test]
    fn empty_language_has_no_transitions() {
        let node = RegExpNode::concatenation(vec![
            RegExpNode::singleton(CharSet::empty()),
            RegExpNode::singleton(CharSet::from_char('x')),
        ]);
        assert_eq!(node, RegExpNode::EmptyLanguage);

        let mut nfa = Nfa::new();
        let mut b = nfa.builder();
        let start = b.new_state(true, NodeData::start(0));
        let end = b.new_state(false, NodeData::end(0, 0));
        node.generate_nfa(&mut b, start, end).unwrap();

        let dfa = create_dfa(&nfa);
        assert_eq!(dfa.num_states(), 1);
        assert_eq!(dfa.transitions().count(), 0);
        assert!(!dfa.state(dfa.start_states()[0]).label().is_terminal());
    }
}
