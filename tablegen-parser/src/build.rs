use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt;

use tablegen_ir::{Associativity, Symbol};
use tablegen_prepare::SyntaxGrammar;

use crate::first::{compute_first_sets, first_of_sequence, FirstSets, NullableSet};
use crate::item::{LookaheadSet, ParseItem, ParseItemSet, ProductionHandle, AUGMENTED_VARIABLE};
use crate::table::{ParseAction, ParseActionType, ParseTable};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Conflict {
    ShiftReduce { state: usize, symbol: Symbol },
    ReduceReduce { state: usize, symbol: Symbol },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseConflictError {
    pub conflicts: Vec<Conflict>,
}

impl fmt::Display for ParseConflictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unresolved parse conflict(s)", self.conflicts.len())
    }
}

impl Error for ParseConflictError {}

/// `None` for the implicit augmented item (`variable_index ==
/// AUGMENTED_VARIABLE`), whose single virtual step references the grammar's
/// start symbol directly rather than through a stored `Production`.
fn symbol_after_dot(item: &ParseItem, grammar: &SyntaxGrammar) -> Option<Symbol> {
    if item.variable_index == AUGMENTED_VARIABLE {
        return if item.step_index == 0 {
            Some(Symbol::non_terminal(0))
        } else {
            None
        };
    }
    grammar.variables[item.variable_index as usize]
        .productions
        .get(item.production.production_index as usize)
        .and_then(|p| p.get(item.step_index))
        .map(|step| step.symbol)
}

fn remaining_symbols(item: &ParseItem, grammar: &SyntaxGrammar) -> Vec<Symbol> {
    if item.variable_index == AUGMENTED_VARIABLE {
        return Vec::new();
    }
    grammar.variables[item.variable_index as usize].productions[item.production.production_index as usize]
        .steps
        .iter()
        .skip(item.step_index + 1)
        .map(|s| s.symbol)
        .collect()
}

/// Start symbol is fixed as the grammar's first variable; the convention a
/// grammar description's ordering is expected to follow (its start rule
/// listed first).
fn start_symbol() -> Symbol {
    Symbol::non_terminal(0)
}

fn augmented_kernel() -> ParseItemSet {
    let mut set = ParseItemSet::new();
    let item = ParseItem::new(ProductionHandle::new(AUGMENTED_VARIABLE, 0), AUGMENTED_VARIABLE);
    let mut lookahead = LookaheadSet::new();
    lookahead.insert(Symbol::END_OF_INPUT);
    set.insert(item, lookahead);
    set
}

fn closure(
    initial: ParseItemSet,
    grammar: &SyntaxGrammar,
    first_sets: &FirstSets,
    nullable: &NullableSet,
) -> ParseItemSet {
    let mut set = initial;
    let mut worklist: Vec<ParseItem> = set.keys().copied().collect();
    while let Some(item) = worklist.pop() {
        let lookaheads = set.get(&item).cloned().unwrap_or_default();
        let symbol = match symbol_after_dot(&item, grammar) {
            Some(s) => s,
            None => continue,
        };
        if !symbol.is_non_terminal() {
            continue;
        }
        let rest = remaining_symbols(&item, grammar);
        let new_lookaheads = first_of_sequence(&rest, &lookaheads, first_sets, nullable);
        let variable = &grammar.variables[symbol.index as usize];
        for production_index in 0..variable.productions.len() {
            let handle = ProductionHandle::new(symbol.index, production_index as u32);
            let new_item = ParseItem::new(handle, symbol.index);
            let entry = set.entry(new_item).or_insert_with(LookaheadSet::new);
            let before = entry.len();
            entry.extend(new_lookaheads.iter().copied());
            if entry.len() != before {
                worklist.push(new_item);
            }
        }
    }
    set
}

fn goto_sets(
    item_set: &ParseItemSet,
    grammar: &SyntaxGrammar,
    first_sets: &FirstSets,
    nullable: &NullableSet,
) -> BTreeMap<Symbol, ParseItemSet> {
    let mut per_symbol: BTreeMap<Symbol, ParseItemSet> = BTreeMap::new();
    for (item, lookaheads) in item_set {
        if let Some(symbol) = symbol_after_dot(item, grammar) {
            let advanced = item.advanced();
            let target = per_symbol.entry(symbol).or_default();
            let entry = target.entry(advanced).or_insert_with(LookaheadSet::new);
            entry.extend(lookaheads.iter().copied());
        }
    }
    per_symbol
        .into_iter()
        .map(|(symbol, kernel)| (symbol, closure(kernel, grammar, first_sets, nullable)))
        .collect()
}

/// Max precedence (and its associativity) among items in `item_set` whose
/// next step is a shift on `symbol`; `None` if no such item carries an
/// explicit precedence annotation.
fn shift_precedence(item_set: &ParseItemSet, symbol: Symbol, grammar: &SyntaxGrammar) -> (i32, Option<Associativity>) {
    let mut best: Option<(i32, Option<Associativity>)> = None;
    for item in item_set.keys() {
        if symbol_after_dot(item, grammar) != Some(symbol) {
            continue;
        }
        if item.variable_index == AUGMENTED_VARIABLE {
            continue;
        }
        let step = &grammar.variables[item.variable_index as usize].productions
            [item.production.production_index as usize]
            .steps[item.step_index];
        let candidate = (step.precedence, step.associativity);
        best = Some(match best {
            Some(prev) if prev.0 >= candidate.0 => prev,
            _ => candidate,
        });
    }
    best.unwrap_or((0, None))
}

fn conflict_symbol_set(entry_actions: &[ParseAction]) -> BTreeSet<Symbol> {
    entry_actions.iter().filter_map(|a| a.symbol).collect()
}

/// Resolves a new reduce candidate landing on a cell that already holds an
/// action: precedence first, associativity second (Left keeps the reduce,
/// Right keeps the shift), otherwise the conflict is contested and both
/// actions are retained with the reduce marked fragile, gated by whether
/// the grammar's conflict declarations cover the participating symbols.
fn resolve_conflict(
    table: &mut ParseTable,
    state: usize,
    lookahead: Symbol,
    candidate: ParseAction,
    expected_conflicts: &[Vec<Symbol>],
    conflicts: &mut Vec<Conflict>,
) {
    let entry = table.states[state]
        .terminal_entries
        .get(&lookahead)
        .cloned()
        .expect("resolve_conflict called without an existing entry");
    let existing = entry.actions.last().copied().unwrap();

    if existing.action_type == ParseActionType::Shift {
        if candidate.precedence > existing.precedence {
            table.states[state]
                .terminal_entries
                .insert(lookahead, crate::table::ParseTableEntry::single(candidate));
            return;
        }
        if candidate.precedence < existing.precedence {
            return; // shift already in place, keep it
        }
        match candidate.associativity {
            Some(Associativity::Left) => {
                table.states[state]
                    .terminal_entries
                    .insert(lookahead, crate::table::ParseTableEntry::single(candidate));
                return;
            }
            Some(Associativity::Right) => return,
            None => {}
        }
    }

    let mut fragile_candidate = candidate;
    fragile_candidate.fragile = true;
    let mut actions = entry.actions.clone();
    actions.push(fragile_candidate);
    let symbols = conflict_symbol_set(&actions);
    let permitted = expected_conflicts
        .iter()
        .any(|set| set.iter().copied().collect::<BTreeSet<_>>() == symbols);

    table.states[state].terminal_entries.insert(
        lookahead,
        crate::table::ParseTableEntry {
            actions,
            reusable: permitted,
            depends_on_lookahead: true,
        },
    );

    if !permitted {
        let conflict = if existing.action_type == ParseActionType::Shift {
            Conflict::ShiftReduce { state, symbol: lookahead }
        } else {
            Conflict::ReduceReduce { state, symbol: lookahead }
        };
        conflicts.push(conflict);
    }
}

/// Builds the canonical LR(1) parse table for `grammar`. Unresolved
/// conflicts not covered by `grammar.expected_conflicts` are collected and
/// returned as an error; the table constructed so far is discarded, since
/// it cannot be trusted to drive a deterministic parse.
pub fn build_parse_table(grammar: &SyntaxGrammar) -> Result<(ParseTable, Vec<ParseItemSet>), ParseConflictError> {
    let (first_sets, nullable) = compute_first_sets(grammar);
    let entry_set = closure(augmented_kernel(), grammar, &first_sets, &nullable);

    let mut table = ParseTable::new();
    let mut state_of: BTreeMap<ParseItemSet, usize> = BTreeMap::new();
    let entry_state = table.add_state();
    state_of.insert(entry_set.clone(), entry_state);

    let mut item_sets: Vec<ParseItemSet> = vec![entry_set];
    let mut unprocessed = vec![entry_state];
    let mut conflicts = Vec::new();

    while let Some(state_index) = unprocessed.pop() {
        let item_set = item_sets[state_index].clone();
        let transitions = goto_sets(&item_set, grammar, &first_sets, &nullable);
        let mut resolved_transitions: BTreeMap<Symbol, usize> = BTreeMap::new();

        for (symbol, target_set) in transitions {
            let target_state = if let Some(&existing) = state_of.get(&target_set) {
                existing
            } else {
                let new_state = table.add_state();
                item_sets.push(target_set.clone());
                state_of.insert(target_set, new_state);
                unprocessed.push(new_state);
                new_state
            };
            resolved_transitions.insert(symbol, target_state);
        }

        for (&symbol, &target) in &resolved_transitions {
            if symbol.is_non_terminal() {
                table.set_nonterminal_action(state_index, symbol.index, target);
            } else {
                let (precedence, associativity) = shift_precedence(&item_set, symbol, grammar);
                let is_extra = grammar.is_extra_token(symbol);
                table.add_terminal_action(
                    state_index,
                    symbol,
                    ParseAction::shift(target, is_extra, precedence, associativity),
                );
            }
        }

        for (item, lookaheads) in &item_set {
            if symbol_after_dot(item, grammar).is_some() {
                continue;
            }
            if item.variable_index == AUGMENTED_VARIABLE {
                if lookaheads.contains(&Symbol::END_OF_INPUT) {
                    table.add_terminal_action(state_index, Symbol::END_OF_INPUT, ParseAction::accept());
                }
                continue;
            }
            let production = &grammar.variables[item.variable_index as usize].productions
                [item.production.production_index as usize];
            let (precedence, associativity) = production
                .end_precedence()
                .map(|(p, a)| (p, a))
                .unwrap_or((0, None));
            let lhs = Symbol::non_terminal(item.variable_index);
            for &lookahead in lookaheads {
                let reduce = ParseAction::reduce(lhs, production.len(), item.production, precedence, associativity);
                if table.states[state_index].terminal_entries.contains_key(&lookahead) {
                    resolve_conflict(&mut table, state_index, lookahead, reduce, &grammar.expected_conflicts, &mut conflicts);
                } else {
                    table.add_terminal_action(state_index, lookahead, reduce);
                }
            }
        }
    }

    if conflicts.is_empty() {
        Ok((table, item_sets))
    } else {
        Err(ParseConflictError { conflicts })
    }
}

/// Post-construction compaction: groups states by their LR(0) core (items
/// and dot positions, ignoring lookaheads) and greedily merges states
/// sharing a core via [`ParseTable::merge_state`]. A distinct pass from
/// table construction itself, matching the state merger's role as a
/// separate pipeline stage.
pub fn merge_compatible_states(table: &mut ParseTable, cores: &[BTreeSet<(u32, u32, u32, usize)>]) {
    let mut groups: BTreeMap<&BTreeSet<(u32, u32, u32, usize)>, Vec<usize>> = BTreeMap::new();
    for (index, core) in cores.iter().enumerate() {
        groups.entry(core).or_default().push(index);
    }
    for members in groups.values() {
        if members.len() < 2 {
            continue;
        }
        let representative = members[0];
        for &candidate in &members[1..] {
            table.merge_state(representative, candidate);
        }
    }
}

/// Encodes an item's core (ignoring lookaheads) as a sortable tuple:
/// `(variable_index, production_index, auxiliary_tag, step_index)`. Used
/// only to group states for [`merge_compatible_states`].
pub fn item_set_core(item_set: &ParseItemSet) -> BTreeSet<(u32, u32, u32, usize)> {
    item_set
        .keys()
        .map(|item| {
            (
                item.variable_index,
                item.production.production_index,
                if item.variable_index == AUGMENTED_VARIABLE { 1 } else { 0 },
                item.step_index,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablegen_ir::{Production, ProductionStep, VariableType};
    use tablegen_prepare::SyntaxVariable;

    fn terminal_production(index: u32) -> Production {
        let mut p = Production::new();
        p.push(ProductionStep::new(Symbol::terminal(index)));
        p
    }

    #[test]
    fn a_single_terminal_grammar_accepts_on_end_of_input() {
        let grammar = SyntaxGrammar {
            variables: vec![SyntaxVariable {
                name: "s".into(),
                kind: VariableType::Named,
                productions: vec![terminal_production(0)],
            }],
            ..Default::default()
        };
        let (table, _item_sets) = build_parse_table(&grammar).unwrap();

        // Shifting the only terminal lands in a state that reduces on EOI...
        let shift_state = table.states[0].terminal_entries[&Symbol::terminal(0)]
            .actions
            .last()
            .unwrap()
            .state_index
            .unwrap();
        let reduce_entry = &table.states[shift_state].terminal_entries[&Symbol::END_OF_INPUT];
        assert_eq!(reduce_entry.actions.last().unwrap().action_type, ParseActionType::Reduce);

        // ...and the entry state's goto on the start symbol leads to the
        // state that accepts once that reduce has been performed.
        let goto_state = table.states[0].nonterminal_entries[&0];
        let accept_entry = &table.states[goto_state].terminal_entries[&Symbol::END_OF_INPUT];
        assert_eq!(accept_entry.actions.last().unwrap().action_type, ParseActionType::Accept);
    }

    // e -> e PLUS e | ID   (left-recursive, ambiguous at "e . + e" vs "e + e .")
    // on lookahead PLUS without a precedence/associativity tie-break. The
    // PLUS step carries the shift side's precedence/associativity; the
    // trailing `e` step carries the reduce side's, via `end_precedence()`.
    const PLUS: u32 = 0;
    const ID: u32 = 1;

    fn ambiguous_sum_grammar(
        shift_prec: i32,
        shift_assoc: Option<Associativity>,
        reduce_prec: i32,
        reduce_assoc: Option<Associativity>,
        expected_conflicts: Vec<Vec<Symbol>>,
    ) -> SyntaxGrammar {
        let mut sum = Production::new();
        sum.push(ProductionStep::new(Symbol::non_terminal(0)));
        sum.push(ProductionStep::new(Symbol::terminal(PLUS)).with_precedence(shift_prec, shift_assoc));
        sum.push(ProductionStep::new(Symbol::non_terminal(0)).with_precedence(reduce_prec, reduce_assoc));
        SyntaxGrammar {
            variables: vec![SyntaxVariable {
                name: "e".into(),
                kind: VariableType::Named,
                productions: vec![sum, terminal_production(ID)],
            }],
            expected_conflicts,
            ..Default::default()
        }
    }

    /// Finds the (unique) entry across every state whose actions include the
    /// `e -> e PLUS e` reduce at `symbol`, regardless of whether it won
    /// outright, lost, or survives alongside a shift.
    fn find_sum_reduce_entry(table: &ParseTable, symbol: Symbol) -> Option<&crate::table::ParseTableEntry> {
        table.states.iter().find_map(|state| {
            state.terminal_entries.get(&symbol).filter(|entry| {
                entry.actions.iter().any(|a| {
                    a.action_type == ParseActionType::Reduce
                        && a.consumed_symbol_count == 3
                        && a.production.map(|p| p.production_index) == Some(0)
                })
            })
        })
    }

    #[test]
    fn higher_precedence_reduce_wins_a_shift_reduce_conflict() {
        let grammar = ambiguous_sum_grammar(1, None, 5, None, Vec::new());
        let (table, _item_sets) = build_parse_table(&grammar).unwrap();

        let entry = find_sum_reduce_entry(&table, Symbol::terminal(PLUS))
            .expect("the e + e . reduce must be recorded somewhere in the table");
        assert_eq!(entry.actions.len(), 1, "higher-precedence reduce must replace the shift outright");
        let action = entry.actions[0];
        assert_eq!(action.action_type, ParseActionType::Reduce);
        assert!(!action.fragile);
    }

    #[test]
    fn equal_precedence_left_associativity_reduce_wins() {
        let grammar = ambiguous_sum_grammar(5, None, 5, Some(Associativity::Left), Vec::new());
        let (table, _item_sets) = build_parse_table(&grammar).unwrap();

        let entry = find_sum_reduce_entry(&table, Symbol::terminal(PLUS))
            .expect("a Left-associative tie must keep the reduce");
        assert_eq!(entry.actions.len(), 1);
        let action = entry.actions[0];
        assert_eq!(action.action_type, ParseActionType::Reduce);
        assert!(!action.fragile);
    }

    #[test]
    fn equal_precedence_right_associativity_shift_wins() {
        let grammar = ambiguous_sum_grammar(5, None, 5, Some(Associativity::Right), Vec::new());
        let (table, _item_sets) = build_parse_table(&grammar).unwrap();

        // A Right-associative tie discards the reduce candidate entirely:
        // the production never appears at this lookahead anywhere in the
        // table, and every PLUS entry that remains is a bare shift.
        assert!(
            find_sum_reduce_entry(&table, Symbol::terminal(PLUS)).is_none(),
            "the reduce candidate must be discarded, not merely outranked"
        );
        let shift_exists = table.states.iter().any(|state| {
            state
                .terminal_entries
                .get(&Symbol::terminal(PLUS))
                .map(|entry| entry.actions.len() == 1 && entry.actions[0].action_type == ParseActionType::Shift)
                .unwrap_or(false)
        });
        assert!(shift_exists, "the shift on PLUS must survive untouched");
    }

    #[test]
    fn unresolvable_tie_is_kept_as_a_fragile_conflict_when_declared() {
        let grammar = ambiguous_sum_grammar(5, None, 5, None, vec![vec![Symbol::terminal(PLUS)]]);
        let (table, _item_sets) = build_parse_table(&grammar).unwrap();

        let entry = find_sum_reduce_entry(&table, Symbol::terminal(PLUS))
            .expect("a declared conflict keeps both actions rather than erroring");
        assert_eq!(entry.actions.len(), 2, "both the shift and the reduce must survive");
        assert!(entry.reusable, "a permitted conflict's entry must be marked reusable");
        assert_eq!(entry.actions[0].action_type, ParseActionType::Shift);
        assert!(!entry.actions[0].fragile);
        assert_eq!(entry.actions[1].action_type, ParseActionType::Reduce);
        assert!(entry.actions[1].fragile, "the surviving reduce must be marked fragile");
    }

    #[test]
    fn unresolvable_tie_is_a_hard_error_when_not_declared() {
        let grammar = ambiguous_sum_grammar(5, None, 5, None, Vec::new());
        let err = build_parse_table(&grammar).expect_err("an undeclared shift/reduce tie must be rejected");

        assert!(err.conflicts.iter().any(|c| matches!(
            c,
            Conflict::ShiftReduce { symbol, .. } if *symbol == Symbol::terminal(PLUS)
        )));
    }
}
