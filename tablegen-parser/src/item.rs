use std::collections::{BTreeMap, BTreeSet};

use tablegen_ir::Symbol;

/// Sentinel `variable_index` for the implicit augmented start item `S' -> S`,
/// never present among the real `SyntaxGrammar` variables. Its single
/// production has one step referencing the grammar's start symbol; when an
/// item over it reaches the end with lookahead end-of-input, the parse
/// builder emits `Accept` instead of a normal `Reduce`.
pub const AUGMENTED_VARIABLE: u32 = u32::MAX;
pub const AUGMENTED_PRODUCTION: usize = 0;

/// A stable handle to one production: which variable it belongs to and its
/// position within that variable's production list. Used both inside
/// [`ParseItem`] (to locate the production being walked) and inside a
/// `Reduce` action (to record which production was reduced).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductionHandle {
    pub variable_index: u32,
    pub production_index: u32,
}

impl ProductionHandle {
    pub fn new(variable_index: u32, production_index: u32) -> Self {
        ProductionHandle {
            variable_index,
            production_index,
        }
    }

    pub fn is_augmented(&self) -> bool {
        self.variable_index == AUGMENTED_VARIABLE
    }
}

/// An LR item: a production handle plus a cursor position. Carries no
/// lookahead itself — lookaheads are tracked per-item in a [`ParseItemSet`]
/// so that closure only has to merge sets rather than duplicate items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParseItem {
    pub variable_index: u32,
    pub production: ProductionHandle,
    pub step_index: usize,
}

impl ParseItem {
    pub fn new(production: ProductionHandle, variable_index: u32) -> Self {
        ParseItem {
            variable_index,
            production,
            step_index: 0,
        }
    }

    pub fn advanced(&self) -> ParseItem {
        ParseItem {
            step_index: self.step_index + 1,
            ..*self
        }
    }
}

pub type LookaheadSet = BTreeSet<Symbol>;

/// A canonical LR(1) state kernel+closure: every item reachable from the
/// kernel, each carrying the exact set of lookaheads valid in this context.
pub type ParseItemSet = BTreeMap<ParseItem, LookaheadSet>;
