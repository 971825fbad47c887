// Finite automata built on top of the generic Graph.

mod alphabet;
mod dfa;
mod split;

pub use self::alphabet::{extract_alphabet, Alphabet};
pub use self::dfa::create_dfa;
pub use self::split::split_distinct_graphs;

use crate::charset::CharSet;
use crate::graph::Graph;

/// Provenance attached to every automaton state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodeData {
    /// Index of the lexer state served by this entry point. In a DFA this is
    /// also set on any state whose NFA states include an NFA start state.
    pub start_index: Option<usize>,

    /// If this is an accepting state, the index of the rule which is matched.
    pub end_index: Option<usize>,

    /// Priority of the matched rule. Lower values win.
    pub priority: Option<usize>,
}

impl NodeData {
    pub fn start(start_index: usize) -> Self {
        Self {
            start_index: Some(start_index),
            ..Self::default()
        }
    }

    pub fn end(end_index: usize, priority: usize) -> Self {
        Self {
            end_index: Some(end_index),
            priority: Some(priority),
            ..Self::default()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.end_index.is_some()
    }

    /// Sort key used to pick a single rule when multiple rules accept in the
    /// same state. None if this isn't an accepting state.
    pub(crate) fn precedence(&self) -> Option<(usize, usize)> {
        self.end_index
            .map(|end| (self.priority.unwrap_or(end), end))
    }
}

/// Automaton with epsilon transitions. Transitions labeled with None are
/// epsilons.
pub type Nfa = Graph<NodeData, Option<CharSet>>;

/// Automaton without epsilon transitions where the labels of the transitions
/// leaving any single state are pairwise disjoint.
pub type Dfa = Graph<NodeData, CharSet>;

/// A transition label which (optionally) consumes a set of characters.
pub trait TransitionLabel {
    /// The characters consumed or None for an epsilon transition.
    fn char_set(&self) -> Option<&CharSet>;
}

impl TransitionLabel for CharSet {
    fn char_set(&self) -> Option<&CharSet> {
        Some(self)
    }
}

impl TransitionLabel for Option<CharSet> {
    fn char_set(&self) -> Option<&CharSet> {
        self.as_ref()
    }
}
