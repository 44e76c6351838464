use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use tablegen_ir::{Associativity, Symbol};

use crate::item::ProductionHandle;

/// Declaration order doubles as the ordering used by [`ParseAction`]'s `Ord`
/// impl whenever two actions otherwise compare equal up to this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParseActionType {
    Error,
    Shift,
    Reduce,
    Accept,
    Recover,
}

/// One entry of a parse table cell. Equal up to the fields its `Ord`
/// impl compares; `precedence`/`associativity` are construction-time
/// bookkeeping for conflict resolution, not part of the action's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParseAction {
    pub action_type: ParseActionType,
    pub extra: bool,
    pub fragile: bool,
    pub state_index: Option<usize>,
    pub symbol: Option<Symbol>,
    pub consumed_symbol_count: usize,
    pub production: Option<ProductionHandle>,
    pub precedence: i32,
    pub associativity: Option<Associativity>,
}

impl ParseAction {
    pub fn error() -> Self {
        ParseAction {
            action_type: ParseActionType::Error,
            extra: false,
            fragile: false,
            state_index: None,
            symbol: None,
            consumed_symbol_count: 0,
            production: None,
            precedence: 0,
            associativity: None,
        }
    }

    pub fn shift(state_index: usize, extra: bool, precedence: i32, associativity: Option<Associativity>) -> Self {
        ParseAction {
            action_type: ParseActionType::Shift,
            extra,
            fragile: false,
            state_index: Some(state_index),
            symbol: None,
            consumed_symbol_count: 0,
            production: None,
            precedence,
            associativity,
        }
    }

    pub fn reduce(
        symbol: Symbol,
        consumed_symbol_count: usize,
        production: ProductionHandle,
        precedence: i32,
        associativity: Option<Associativity>,
    ) -> Self {
        ParseAction {
            action_type: ParseActionType::Reduce,
            extra: false,
            fragile: false,
            state_index: None,
            symbol: Some(symbol),
            consumed_symbol_count,
            production: Some(production),
            precedence,
            associativity,
        }
    }

    pub fn accept() -> Self {
        ParseAction {
            action_type: ParseActionType::Accept,
            extra: false,
            fragile: false,
            state_index: None,
            symbol: None,
            consumed_symbol_count: 0,
            production: None,
            precedence: 0,
            associativity: None,
        }
    }
}

impl PartialOrd for ParseAction {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Lexicographic on (type, extra, fragile, symbol, state_index,
/// production-handle, consumed_count), giving every action a total order.
impl Ord for ParseAction {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.action_type
            .cmp(&other.action_type)
            .then(self.extra.cmp(&other.extra))
            .then(self.fragile.cmp(&other.fragile))
            .then(self.symbol.cmp(&other.symbol))
            .then(self.state_index.cmp(&other.state_index))
            .then(self.production.cmp(&other.production))
            .then(self.consumed_symbol_count.cmp(&other.consumed_symbol_count))
    }
}

/// One parse-table cell. More than one action denotes a conflict: either an
/// unresolved ambiguity kept alive for GLR-style fallback, or a precedence
/// tie the grammar's conflict declarations explicitly permit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTableEntry {
    pub actions: Vec<ParseAction>,
    pub reusable: bool,
    pub depends_on_lookahead: bool,
}

impl ParseTableEntry {
    pub fn single(action: ParseAction) -> Self {
        ParseTableEntry {
            actions: vec![action],
            reusable: true,
            depends_on_lookahead: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParseState {
    pub terminal_entries: BTreeMap<Symbol, ParseTableEntry>,
    pub nonterminal_entries: BTreeMap<u32, usize>,
    pub lex_state_id: Option<usize>,
}

impl ParseState {
    /// Hash fingerprint of the state's shift actions, used to cheaply rule
    /// out most merge candidates before running the full comparison.
    pub fn shift_actions_signature(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        for (symbol, entry) in &self.terminal_entries {
            if let Some(last) = entry.actions.last() {
                if last.action_type == ParseActionType::Shift {
                    symbol.hash(&mut hasher);
                    last.state_index.hash(&mut hasher);
                }
            }
        }
        hasher.finish()
    }

    pub fn has_shift_action(&self) -> bool {
        let has_terminal_shift = self
            .terminal_entries
            .values()
            .any(|e| matches!(e.actions.last(), Some(a) if a.action_type == ParseActionType::Shift));
        has_terminal_shift || !self.nonterminal_entries.is_empty()
    }

    pub fn expected_inputs(&self) -> impl Iterator<Item = &Symbol> {
        self.terminal_entries.keys()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolMeta {
    pub extra: bool,
    pub structural: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ParseTable {
    pub states: Vec<ParseState>,
    pub symbols: BTreeMap<Symbol, SymbolMeta>,
    pub mergeable_symbols: BTreeSet<Symbol>,
}

impl ParseTable {
    pub fn new() -> Self {
        ParseTable::default()
    }

    pub fn add_state(&mut self) -> usize {
        self.states.push(ParseState::default());
        self.states.len() - 1
    }

    /// Records `action` in `state`'s entry for `sym`, returning a reference
    /// to it so the caller can further annotate it (e.g. mark it fragile).
    pub fn add_terminal_action(&mut self, state: usize, sym: Symbol, action: ParseAction) -> &mut ParseAction {
        if action.action_type == ParseActionType::Shift && action.extra {
            self.symbols.entry(sym).or_default().extra = true;
        } else {
            self.symbols.entry(sym).or_default().structural = true;
        }
        let entry = self.states[state]
            .terminal_entries
            .entry(sym)
            .or_insert_with(|| ParseTableEntry {
                actions: Vec::new(),
                reusable: true,
                depends_on_lookahead: false,
            });
        entry.actions.push(action);
        entry.actions.last_mut().unwrap()
    }

    pub fn set_nonterminal_action(&mut self, state: usize, idx: u32, next: usize) {
        self.symbols
            .entry(Symbol::non_terminal(idx))
            .or_default()
            .structural = true;
        self.states[state].nonterminal_entries.insert(idx, next);
    }

    pub fn all_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.keys()
    }

    /// Visits every state id a state's actions/gotos refer to. Only `Shift`
    /// and `Recover` actions carry a meaningful `state_index` — an `Error`
    /// action's `state_index` is always `None` and must never be visited.
    pub fn each_referenced_state<F: FnMut(&mut usize)>(&mut self, state: usize, mut f: F) {
        for entry in self.states[state].terminal_entries.values_mut() {
            for action in &mut entry.actions {
                if action.action_type == ParseActionType::Shift || action.action_type == ParseActionType::Recover {
                    if let Some(index) = action.state_index.as_mut() {
                        f(index);
                    }
                }
            }
        }
        for target in self.states[state].nonterminal_entries.values_mut() {
            f(target);
        }
    }

    /// Attempts to merge state `j` into state `i`. On success, `j`'s
    /// lookahead-only entries are copied into `i` and every reference to
    /// `j` across the table is rewritten to `i`; returns whether the merge
    /// was performed.
    pub fn merge_state(&mut self, i: usize, j: usize) -> bool {
        if i == j {
            return false;
        }
        if self.states[i].nonterminal_entries != self.states[j].nonterminal_entries {
            return false;
        }

        let mergeable = self.mergeable_symbols.clone();
        let is_mergeable_lookahead = |symbol: &Symbol| mergeable.contains(symbol) || symbol.is_built_in();

        for (symbol, entry_i) in &self.states[i].terminal_entries {
            if let Some(entry_j) = self.states[j].terminal_entries.get(symbol) {
                if entry_i != entry_j {
                    return false;
                }
            } else {
                if !is_mergeable_lookahead(symbol) {
                    return false;
                }
                let is_default_reduce_elsewhere = self.states[j]
                    .terminal_entries
                    .values()
                    .any(|e| e == entry_i);
                let last_is_reduce =
                    matches!(entry_i.actions.last(), Some(a) if a.action_type == ParseActionType::Reduce);
                if !(last_is_reduce && is_default_reduce_elsewhere) {
                    return false;
                }
            }
        }

        let mut to_copy = Vec::new();
        for (symbol, entry_j) in &self.states[j].terminal_entries {
            if !self.states[i].terminal_entries.contains_key(symbol) {
                if !is_mergeable_lookahead(symbol) {
                    return false;
                }
                let is_default_reduce_elsewhere = self.states[i]
                    .terminal_entries
                    .values()
                    .any(|e| e == entry_j);
                let last_is_reduce =
                    matches!(entry_j.actions.last(), Some(a) if a.action_type == ParseActionType::Reduce);
                if !(last_is_reduce && is_default_reduce_elsewhere) {
                    return false;
                }
                to_copy.push((*symbol, entry_j.clone()));
            }
        }

        for (symbol, entry) in to_copy {
            self.states[i].terminal_entries.insert(symbol, entry);
        }

        for state_index in 0..self.states.len() {
            self.each_referenced_state(state_index, |target| {
                if *target == j {
                    *target = i;
                }
            });
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift_entry(target: usize) -> ParseTableEntry {
        ParseTableEntry::single(ParseAction::shift(target, false, 0, None))
    }

    #[test]
    fn each_referenced_state_skips_error_actions() {
        let mut table = ParseTable::new();
        let s0 = table.add_state();
        table.add_state();
        let mut error_action = ParseAction::error();
        error_action.state_index = Some(999); // simulates the source bug's corrupted field
        table.states[s0]
            .terminal_entries
            .insert(Symbol::terminal(0), ParseTableEntry::single(error_action));

        let mut visited = Vec::new();
        table.each_referenced_state(s0, |target| visited.push(*target));
        assert!(visited.is_empty(), "Error actions must never be visited");
    }

    #[test]
    fn each_referenced_state_visits_shift_and_goto() {
        let mut table = ParseTable::new();
        let s0 = table.add_state();
        table.add_state();
        table.add_state();
        table.add_terminal_action(s0, Symbol::terminal(0), ParseAction::shift(1, false, 0, None));
        table.set_nonterminal_action(s0, 0, 2);

        let mut visited = Vec::new();
        table.each_referenced_state(s0, |target| visited.push(*target));
        visited.sort();
        assert_eq!(visited, vec![1, 2]);
    }

    #[test]
    fn merge_fails_when_nonterminal_entries_differ() {
        let mut table = ParseTable::new();
        let i = table.add_state();
        let j = table.add_state();
        table.set_nonterminal_action(i, 0, 5);
        assert!(!table.merge_state(i, j));
    }

    #[test]
    fn merge_succeeds_for_shared_default_reduce_under_mergeable_lookahead() {
        let mut table = ParseTable::new();
        let i = table.add_state();
        let j = table.add_state();
        let handle = ProductionHandle::new(0, 0);
        let reduce = ParseAction::reduce(Symbol::non_terminal(0), 1, handle, 0, None);
        table.add_terminal_action(i, Symbol::terminal(0), reduce);
        table.add_terminal_action(j, Symbol::terminal(1), reduce);
        table.mergeable_symbols.insert(Symbol::terminal(1));
        table.mergeable_symbols.insert(Symbol::terminal(0));

        assert!(table.merge_state(i, j));
        assert!(table.states[i].terminal_entries.contains_key(&Symbol::terminal(1)));
    }

    #[test]
    fn merge_fails_when_the_only_differing_entry_is_a_shift() {
        let mut table = ParseTable::new();
        let i = table.add_state();
        let j = table.add_state();
        table.states[i]
            .terminal_entries
            .insert(Symbol::terminal(0), shift_entry(3));
        table.states[j]
            .terminal_entries
            .insert(Symbol::terminal(1), shift_entry(3));
        table.mergeable_symbols.insert(Symbol::terminal(0));
        table.mergeable_symbols.insert(Symbol::terminal(1));

        assert!(!table.merge_state(i, j));
    }
}
