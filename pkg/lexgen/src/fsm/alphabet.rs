use std::collections::BTreeSet;

use crate::charset::{CharSet, MAX_CHAR};
use crate::fsm::TransitionLabel;
use crate::graph::Graph;

/// Splits the character domain into the coarsest list of disjoint classes such
/// that every given label is a union of whole classes.
///
/// One refinement pass per label is enough: once a label has been applied no
/// class straddles it, and later refinements only split classes further.
///
/// The returned classes are sorted by their smallest character.
pub(crate) fn partition<'a, I>(labels: I) -> Vec<CharSet>
where
    I: IntoIterator<Item = &'a CharSet>,
{
    let labels: BTreeSet<&CharSet> = labels.into_iter().collect();

    let mut classes = vec![CharSet::universal()];
    for label in labels {
        if label.is_empty() || label.is_universal() {
            continue;
        }

        let mut refined = Vec::with_capacity(classes.len() + 1);
        for class in classes {
            let inside = class.intersection(label);
            if inside.is_empty() || inside == class {
                refined.push(class);
                continue;
            }

            refined.push(class.subtract(label));
            refined.push(inside);
        }

        classes = refined;
    }

    classes.sort_by_key(|c| c.min_char());
    classes
}

/// Computes the minimal set of character classes needed to evaluate every
/// transition in the given graph.
pub fn extract_alphabet<N, T: TransitionLabel>(graph: &Graph<N, T>) -> Alphabet {
    let classes = partition(graph.transitions().filter_map(|t| t.label().char_set()));
    debug!("Extracted alphabet of {} character classes", classes.len());
    Alphabet::new(classes)
}

/// Ordered partition of the character domain into classes.
///
/// Class indices are positions in classes() and are what generated scanners
/// use as the columns of their transition tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alphabet {
    classes: Vec<CharSet>,

    /// Every contained range of every class as (from, to, class index),
    /// sorted by 'from'. Covers the whole domain without gaps.
    lookup: Vec<(u32, u32, usize)>,
}

impl Alphabet {
    pub(crate) fn new(classes: Vec<CharSet>) -> Self {
        let mut lookup = vec![];
        for (i, class) in classes.iter().enumerate() {
            for r in class.positive_ranges() {
                lookup.push((r.from(), r.to(), i));
            }
        }
        lookup.sort();

        Self { classes, lookup }
    }

    pub fn classes(&self) -> &[CharSet] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Index of the class containing the given character.
    pub fn class_of(&self, c: u32) -> Option<usize> {
        if c > MAX_CHAR {
            return None;
        }

        // Index of the last range starting at or before c.
        let i = match self.lookup.binary_search_by_key(&c, |(from, _, _)| *from) {
            Ok(i) => i,
            Err(0) => return None,
            Err(i) => i - 1,
        };

        let (_, to, class) = self.lookup[i];
        if c <= to {
            Some(class)
        } else {
            None
        }
    }

    /// Indices of all classes which together make up the given label.
    pub fn classes_in(&self, label: &CharSet) -> Vec<usize> {
        self.classes
            .iter()
            .enumerate()
            .filter(|(_, class)| class.intersects(label))
            .map(|(i, class)| {
                debug_assert!(label.is_superset_of(class));
                i
            })
            .collect()
    }
}
