use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::rc::Rc;

use tablegen_ir::{Rule, MAX_CODE_POINT};

/// A minimal partition of the code-point space into contiguous ranges such
/// that every `CharacterSet` appearing across the compiled rules is a union
/// of whole alphabet ranges. Built from the set's range *boundaries*
/// rather than individual characters, so it stays compact even for large
/// Unicode classes like `\w` or `.`.
#[derive(Debug, Clone)]
pub struct Alphabet {
    ranges: Vec<RangeInclusive<u32>>,
}

impl Alphabet {
    pub fn find_range(&self, c: u32) -> Option<usize> {
        let search = self.ranges.binary_search_by_key(&c, |r| *r.start());
        match search {
            Ok(index) => Some(index),
            Err(index) => {
                if index == 0 {
                    None
                } else if self.ranges[index - 1].contains(&c) {
                    Some(index - 1)
                } else {
                    None
                }
            }
        }
    }

    pub fn ranges(&self) -> &[RangeInclusive<u32>] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }
}

fn collect_breakpoints(rule: &Rule, points: &mut BTreeSet<u32>) {
    match rule {
        Rule::Blank | Rule::Symbol(_) => {}
        Rule::CharacterSet(set) => {
            for &(lo, hi) in set.ranges() {
                points.insert(lo);
                if hi < MAX_CODE_POINT {
                    points.insert(hi + 1);
                }
            }
        }
        Rule::Choice(children) => {
            for child in children {
                collect_breakpoints(child, points);
            }
        }
        Rule::Seq(left, right) => {
            collect_breakpoints(left, points);
            collect_breakpoints(right, points);
        }
        Rule::Repeat(inner) => collect_breakpoints(inner, points),
        Rule::Metadata { rule, .. } => collect_breakpoints(rule, points),
    }
}

/// Builds the minimal alphabet partition covering every character set used
/// across `rules`.
pub fn generate_alphabet<'a, I: IntoIterator<Item = &'a Rc<Rule>>>(rules: I) -> Alphabet {
    let mut points = BTreeSet::new();
    for rule in rules {
        collect_breakpoints(rule, &mut points);
    }
    points.insert(0);
    if MAX_CODE_POINT < u32::MAX {
        points.insert(MAX_CODE_POINT + 1);
    }

    let points: Vec<u32> = points.into_iter().collect();
    let mut ranges = Vec::with_capacity(points.len().saturating_sub(1));
    for window in points.windows(2) {
        ranges.push(window[0]..=(window[1] - 1));
    }
    Alphabet { ranges }
}
