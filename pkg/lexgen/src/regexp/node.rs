use crate::charset::CharSet;
use crate::errors::GraphError;
use crate::fsm::NodeData;
use crate::graph::{GraphBuilder, StateId};
use crate::regexp::syntax::{parse_with_options, ParseOptions, RegExpParseError};

/// A node in a simplified regular expression tree.
///
/// Trees should only be built with the constructor functions below (e.g.
/// RegExpNode::concatenation) which keep the tree in normal form:
/// - Concatenation/Union nodes have at least 2 children and never directly
///   contain another node of the same kind.
/// - A Union never contains EmptyLanguage and a Concatenation never contains
///   EmptyString or EmptyLanguage.
/// - A KleeneStar never wraps another KleeneStar or a trivially empty node.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum RegExpNode {
    /// Matches nothing.
    EmptyLanguage,

    /// Matches only the empty string.
    EmptyString,

    /// Matches exactly one character from the set.
    Singleton(CharSet),

    /// e.g. 'abc'
    Concatenation(Vec<RegExpNode>),

    /// e.g. 'a|b|c'
    Union(Vec<RegExpNode>),

    /// e.g. 'a*'
    KleeneStar(Box<RegExpNode>),
}

impl RegExpNode {
    /// Parses an expression using the default parser options.
    pub fn parse(text: &str) -> Result<Self, RegExpParseError> {
        parse_with_options(text, &ParseOptions::default())
    }

    pub fn singleton(set: CharSet) -> Self {
        if set.is_empty() {
            Self::EmptyLanguage
        } else {
            Self::Singleton(set)
        }
    }

    pub fn concatenation(items: Vec<Self>) -> Self {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Self::EmptyLanguage => return Self::EmptyLanguage,
                Self::EmptyString => {}
                Self::Concatenation(inner) => out.extend(inner),
                other => out.push(other),
            }
        }

        match out.len() {
            0 => Self::EmptyString,
            1 => out.remove(0),
            _ => Self::Concatenation(out),
        }
    }

    pub fn union(items: Vec<Self>) -> Self {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Self::EmptyLanguage => {}
                Self::Union(inner) => out.extend(inner),
                other => out.push(other),
            }
        }

        match out.len() {
            0 => Self::EmptyLanguage,
            1 => out.remove(0),
            _ => Self::Union(out),
        }
    }

    pub fn kleene_star(inner: Self) -> Self {
        match inner {
            Self::EmptyLanguage | Self::EmptyString => Self::EmptyString,
            Self::KleeneStar(_) => inner,
            Self::Union(members) => {
                if !members.contains(&Self::EmptyString) {
                    return Self::KleeneStar(Box::new(Self::Union(members)));
                }

                // (a|)* == a*
                let members = members
                    .into_iter()
                    .filter(|m| *m != Self::EmptyString)
                    .collect();
                Self::kleene_star(Self::union(members))
            }
            other => Self::KleeneStar(Box::new(other)),
        }
    }

    /// e.g. 'a?'
    pub fn optional(inner: Self) -> Self {
        Self::union(vec![inner, Self::EmptyString])
    }

    /// Matches between 'min' and 'max' (inclusive) copies of 'inner'. No
    /// upper bound if 'max' is None.
    pub fn repetition(inner: Self, min: usize, max: Option<usize>) -> Self {
        if let Some(max) = max {
            assert!(min <= max, "Invalid repetition {{{},{}}}", min, max);
        }

        // Any number of copies of an expression which matches the empty string
        // also matches fewer copies.
        let min = if inner.matches_empty_string() { 0 } else { min };

        let mut items = vec![];
        for _ in 0..min {
            items.push(inner.clone());
        }

        match max {
            Some(max) => {
                for _ in min..max {
                    items.push(Self::optional(inner.clone()));
                }
            }
            None => items.push(Self::kleene_star(inner)),
        }

        Self::concatenation(items)
    }

    pub fn matches_empty_string(&self) -> bool {
        match self {
            Self::EmptyString | Self::KleeneStar(_) => true,
            Self::EmptyLanguage | Self::Singleton(_) => false,
            Self::Concatenation(items) => items.iter().all(|i| i.matches_empty_string()),
            Self::Union(items) => items.iter().any(|i| i.matches_empty_string()),
        }
    }

    /// Appends a Thompson style NFA fragment for this expression to the graph.
    /// The fragment starts at 'from' and ends at 'to': any path from 'from' to
    /// 'to' through the new transitions spells a string matched by this
    /// expression.
    pub fn generate_nfa(
        &self,
        builder: &mut GraphBuilder<NodeData, Option<CharSet>>,
        from: StateId,
        to: StateId,
    ) -> Result<(), GraphError> {
        match self {
            Self::EmptyLanguage => {}
            Self::EmptyString => {
                builder.add_unlabeled_transition(from, to)?;
            }
            Self::Singleton(set) => {
                builder.add_transition(from, to, Some(set.clone()))?;
            }
            Self::Concatenation(items) => {
                let mut current = from;
                for (i, item) in items.iter().enumerate() {
                    let next = if i + 1 == items.len() {
                        to
                    } else {
                        builder.new_state(false, NodeData::default())
                    };

                    item.generate_nfa(builder, current, next)?;
                    current = next;
                }
            }
            Self::Union(items) => {
                for item in items {
                    item.generate_nfa(builder, from, to)?;
                }
            }
            Self::KleeneStar(inner) => {
                let pivot = builder.new_state(false, NodeData::default());
                inner.generate_nfa(builder, pivot, pivot)?;
                builder.add_unlabeled_transition(from, pivot)?;
                builder.add_unlabeled_transition(pivot, to)?;
            }
        }

        Ok(())
    }
}
