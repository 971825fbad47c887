// Interval based character sets.
//
// Characters are represented as code point values in the range
// [MIN_CHAR, MAX_CHAR]. A CharSet is a sorted list of disjoint, non-adjacent
// ranges plus an 'invert' flag which makes the set denote the complement of
// the listed ranges.

use std::convert::TryFrom;
use std::fmt;

/// Smallest value in the character domain.
pub const MIN_CHAR: u32 = 0;

/// Largest value in the character domain (the largest Unicode code point).
pub const MAX_CHAR: u32 = 0x10FFFF;

/// Inclusive range of characters. Always has 'from <= to'.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CharRange {
    from: u32,
    to: u32,
}

impl CharRange {
    pub fn new(from: u32, to: u32) -> Self {
        assert!(
            from <= to,
            "Invalid character range: {:#x} is after {:#x}",
            from,
            to
        );
        assert!(to <= MAX_CHAR, "Character {:#x} is out of range", to);
        Self { from, to }
    }

    pub fn single(c: u32) -> Self {
        Self::new(c, c)
    }

    pub fn from_chars(from: char, to: char) -> Self {
        Self::new(from as u32, to as u32)
    }

    pub fn from(&self) -> u32 {
        self.from
    }

    pub fn to(&self) -> u32 {
        self.to
    }

    pub fn contains(&self, c: u32) -> bool {
        self.from <= c && c <= self.to
    }

    /// Number of characters in the range.
    pub fn len(&self) -> u32 {
        self.to - self.from + 1
    }
}

/// Immutable set of characters.
///
/// The representation is canonical: the ranges are always sorted and merged
/// and a set is stored inverted exactly when it contains MAX_CHAR. Two sets
/// are therefore equal iff they contain the same characters.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CharSet {
    ranges: Vec<CharRange>,
    invert: bool,
}

impl CharSet {
    /// Creates a set containing exactly the characters in the given ranges.
    /// The ranges may be in any order and may overlap.
    pub fn new(ranges: Vec<CharRange>) -> Self {
        Self::canonical(normalize(ranges), false)
    }

    /// Creates a set containing every character not in the given ranges.
    pub fn new_inverted(ranges: Vec<CharRange>) -> Self {
        Self::canonical(normalize(ranges), true)
    }

    pub fn empty() -> Self {
        Self {
            ranges: vec![],
            invert: false,
        }
    }

    pub fn universal() -> Self {
        Self {
            ranges: vec![],
            invert: true,
        }
    }

    pub fn single(c: u32) -> Self {
        Self::new(vec![CharRange::single(c)])
    }

    pub fn from_char(c: char) -> Self {
        Self::single(c as u32)
    }

    pub fn from_range(range: CharRange) -> Self {
        Self::new(vec![range])
    }

    pub fn from_chars<I: IntoIterator<Item = char>>(chars: I) -> Self {
        Self::new(chars.into_iter().map(|c| CharRange::single(c as u32)).collect())
    }

    /// Builds the canonical form from an already normalized range list.
    fn canonical(mut ranges: Vec<CharRange>, mut invert: bool) -> Self {
        let touches_max = ranges.last().map(|r| r.to == MAX_CHAR).unwrap_or(false);
        if touches_max {
            ranges = complement(&ranges);
            invert = !invert;
        }

        Self { ranges, invert }
    }

    /// Whether the stored ranges denote the complement of this set.
    pub fn is_inverted(&self) -> bool {
        self.invert
    }

    /// The stored ranges. If the set is inverted, these are the characters
    /// NOT in the set.
    pub fn ranges(&self) -> &[CharRange] {
        &self.ranges
    }

    /// Explicit list of all ranges contained in this set.
    pub fn positive_ranges(&self) -> Vec<CharRange> {
        if self.invert {
            complement(&self.ranges)
        } else {
            self.ranges.clone()
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.invert && self.ranges.is_empty()
    }

    pub fn is_universal(&self) -> bool {
        self.invert && self.ranges.is_empty()
    }

    /// Smallest character in the set.
    pub fn min_char(&self) -> Option<u32> {
        if !self.invert {
            return self.ranges.first().map(|r| r.from);
        }

        match self.ranges.first() {
            Some(r) if r.from == MIN_CHAR => Some(r.to + 1),
            _ => Some(MIN_CHAR),
        }
    }

    /// Number of characters in the set.
    pub fn len(&self) -> u32 {
        let listed: u32 = self.ranges.iter().map(|r| r.len()).sum();
        if self.invert {
            (MAX_CHAR - MIN_CHAR + 1) - listed
        } else {
            listed
        }
    }

    pub fn contains_char(&self, c: u32) -> bool {
        let listed = self
            .ranges
            .binary_search_by(|r| {
                if r.to < c {
                    std::cmp::Ordering::Less
                } else if r.from > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok();

        listed != self.invert
    }

    pub fn contains(&self, c: char) -> bool {
        self.contains_char(c as u32)
    }

    pub fn complement(&self) -> Self {
        // Flipping the flag keeps the representation canonical as the stored
        // ranges never include MAX_CHAR.
        Self {
            ranges: self.ranges.clone(),
            invert: !self.invert,
        }
    }

    pub fn union(&self, other: &CharSet) -> Self {
        let (a, b) = (&self.ranges, &other.ranges);
        match (self.invert, other.invert) {
            (false, false) => Self::canonical(union(a, b), false),
            // ~A | ~B == ~(A & B)
            (true, true) => Self::canonical(intersection(a, b), true),
            // A | ~B == ~(B - A)
            (false, true) => Self::canonical(difference(b, a), true),
            (true, false) => Self::canonical(difference(a, b), true),
        }
    }

    pub fn intersection(&self, other: &CharSet) -> Self {
        let (a, b) = (&self.ranges, &other.ranges);
        match (self.invert, other.invert) {
            (false, false) => Self::canonical(intersection(a, b), false),
            // ~A & ~B == ~(A | B)
            (true, true) => Self::canonical(union(a, b), true),
            // A & ~B == A - B
            (false, true) => Self::canonical(difference(a, b), false),
            (true, false) => Self::canonical(difference(b, a), false),
        }
    }

    pub fn subtract(&self, other: &CharSet) -> Self {
        self.intersection(&other.complement())
    }

    pub fn intersects(&self, other: &CharSet) -> bool {
        !self.intersection(other).is_empty()
    }

    pub fn is_superset_of(&self, other: &CharSet) -> bool {
        other.subtract(self).is_empty()
    }
}

/// Sorts the ranges and merges any that overlap or touch.
fn normalize(mut ranges: Vec<CharRange>) -> Vec<CharRange> {
    ranges.sort();

    let mut out: Vec<CharRange> = Vec::with_capacity(ranges.len());
    for r in ranges {
        if let Some(last) = out.last_mut() {
            if r.from <= last.to + 1 {
                if r.to > last.to {
                    last.to = r.to;
                }
                continue;
            }
        }

        out.push(r);
    }

    out
}

fn union(a: &[CharRange], b: &[CharRange]) -> Vec<CharRange> {
    let mut all = Vec::with_capacity(a.len() + b.len());
    all.extend_from_slice(a);
    all.extend_from_slice(b);
    normalize(all)
}

fn intersection(a: &[CharRange], b: &[CharRange]) -> Vec<CharRange> {
    let mut out = vec![];
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let from = a[i].from.max(b[j].from);
        let to = a[i].to.min(b[j].to);
        if from <= to {
            out.push(CharRange { from, to });
        }

        if a[i].to < b[j].to {
            i += 1;
        } else {
            j += 1;
        }
    }

    out
}

fn complement(ranges: &[CharRange]) -> Vec<CharRange> {
    let mut out = vec![];
    let mut next = MIN_CHAR;
    for r in ranges {
        if r.from > next {
            out.push(CharRange {
                from: next,
                to: r.from - 1,
            });
        }

        if r.to == MAX_CHAR {
            return out;
        }
        next = r.to + 1;
    }

    out.push(CharRange {
        from: next,
        to: MAX_CHAR,
    });
    out
}

fn difference(a: &[CharRange], b: &[CharRange]) -> Vec<CharRange> {
    intersection(a, &complement(b))
}

fn write_char(f: &mut fmt::Formatter, c: u32) -> fmt::Result {
    let ch = match char::try_from(c) {
        Ok(ch) => ch,
        Err(_) => return write!(f, "\\u{{{:x}}}", c),
    };

    match ch {
        '\n' => f.write_str("\\n"),
        '\r' => f.write_str("\\r"),
        '\t' => f.write_str("\\t"),
        '\0' => f.write_str("\\0"),
        '\\' | ']' | '[' | '^' | '-' | ',' => write!(f, "\\{}", ch),
        _ if ch.is_control() || (ch.is_whitespace() && ch != ' ') => {
            write!(f, "\\u{{{:x}}}", c)
        }
        _ => write!(f, "{}", ch),
    }
}

impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        if self.invert {
            f.write_str("^")?;
        }

        for (i, r) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }

            write_char(f, r.from)?;
            if r.to != r.from {
                f.write_str("-")?;
                write_char(f, r.to)?;
            }
        }

        f.write_str("]")
    }
}

impl fmt::Debug for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
