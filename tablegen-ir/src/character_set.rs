use std::fmt::{self, Display};

use crate::rule::Rule;

/// Highest Unicode scalar value representable in a [`CharacterSet`].
pub const MAX_CODE_POINT: u32 = 0x10FFFF;

/// Canonical inclusive set over Unicode scalar values.
///
/// The internal representation is always a sorted sequence of disjoint,
/// non-adjacent `(lo, hi)` ranges, so structural equality of two sets
/// implies they contain exactly the same code points and vice versa.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CharacterSet {
    ranges: Vec<(u32, u32)>,
}

impl CharacterSet {
    pub fn new() -> Self {
        CharacterSet { ranges: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[(u32, u32)] {
        &self.ranges
    }

    pub fn contains(&self, c: u32) -> bool {
        match self.ranges.binary_search_by_key(&c, |(lo, _)| *lo) {
            Ok(_) => true,
            Err(idx) => idx > 0 && self.ranges[idx - 1].1 >= c,
        }
    }

    /// Sets this set to the entire Unicode scalar range.
    pub fn include_all(&mut self) -> &mut Self {
        self.ranges = vec![(0, MAX_CODE_POINT)];
        self
    }

    pub fn include(&mut self, c: u32) -> &mut Self {
        self.include_range(c, c)
    }

    pub fn include_range(&mut self, lo: u32, hi: u32) -> &mut Self {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        self.ranges.push((lo, hi));
        self.normalize();
        self
    }

    pub fn exclude(&mut self, c: u32) -> &mut Self {
        self.exclude_range(c, c)
    }

    pub fn exclude_range(&mut self, lo: u32, hi: u32) -> &mut Self {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let mut result = Vec::with_capacity(self.ranges.len() + 1);
        for &(r_lo, r_hi) in &self.ranges {
            if r_hi < lo || r_lo > hi {
                result.push((r_lo, r_hi));
                continue;
            }
            if r_lo < lo {
                result.push((r_lo, lo - 1));
            }
            if r_hi > hi {
                result.push((hi + 1, r_hi));
            }
        }
        self.ranges = result;
        self
    }

    /// Unions `other` into this set.
    pub fn add_set(&mut self, other: &CharacterSet) -> &mut Self {
        self.ranges.extend_from_slice(&other.ranges);
        self.normalize();
        self
    }

    /// Removes every code point in `other` from this set.
    pub fn remove_set(&mut self, other: &CharacterSet) -> &mut Self {
        for &(lo, hi) in &other.ranges {
            self.exclude_range(lo, hi);
        }
        self
    }

    /// Wraps an owned clone of this set as a [`Rule::CharacterSet`] leaf.
    pub fn copy(&self) -> Rule {
        Rule::CharacterSet(self.clone())
    }

    fn normalize(&mut self) {
        self.ranges.sort_unstable();
        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(self.ranges.len());
        for &(lo, hi) in &self.ranges {
            if let Some(last) = merged.last_mut() {
                if lo <= last.1 || lo == last.1.saturating_add(1) {
                    last.1 = last.1.max(hi);
                    continue;
                }
            }
            merged.push((lo, hi));
        }
        self.ranges = merged;
    }
}

impl Display for CharacterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (lo, hi)) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            if lo == hi {
                write!(f, "{:x}", lo)?;
            } else {
                write!(f, "{:x}-{:x}", lo, hi)?;
            }
        }
        write!(f, "]")
    }
}
