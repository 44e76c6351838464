use std::collections::BTreeMap;

use tablegen_ir::Symbol;
use tablegen_prepare::SyntaxGrammar;

use crate::item::LookaheadSet;

pub type FirstSets = BTreeMap<Symbol, LookaheadSet>;
pub type NullableSet = std::collections::BTreeSet<Symbol>;

/// Computes the FIRST set of every non-terminal in the grammar, and the set
/// of non-terminals that can derive the empty string, by fixpoint iteration
/// over the flattened productions.
pub fn compute_first_sets(grammar: &SyntaxGrammar) -> (FirstSets, NullableSet) {
    let mut first_sets: FirstSets = BTreeMap::new();
    let mut nullable: NullableSet = NullableSet::new();
    for i in 0..grammar.variables.len() {
        first_sets.insert(Symbol::non_terminal(i as u32), LookaheadSet::new());
    }

    loop {
        let mut changed = false;
        for (i, variable) in grammar.variables.iter().enumerate() {
            let lhs = Symbol::non_terminal(i as u32);
            for production in &variable.productions {
                if production.is_empty() {
                    changed |= nullable.insert(lhs);
                    continue;
                }
                let mut all_nullable = true;
                for step_index in 0..production.len() {
                    let symbol = production.get(step_index).unwrap().symbol;
                    if symbol.is_non_terminal() {
                        let contribution: Vec<Symbol> = first_sets
                            .get(&symbol)
                            .map(|set| set.iter().copied().collect())
                            .unwrap_or_default();
                        for s in contribution {
                            changed |= first_sets.get_mut(&lhs).unwrap().insert(s);
                        }
                        if !nullable.contains(&symbol) {
                            all_nullable = false;
                            break;
                        }
                    } else {
                        changed |= first_sets.get_mut(&lhs).unwrap().insert(symbol);
                        all_nullable = false;
                        break;
                    }
                }
                if all_nullable {
                    changed |= nullable.insert(lhs);
                }
            }
        }
        if !changed {
            break;
        }
    }

    (first_sets, nullable)
}

/// FIRST set of `sequence` followed by `trailing`: walks `sequence` left to
/// right, accumulating each symbol's FIRST set while every symbol seen so
/// far is nullable; stops at the first non-nullable symbol. If the whole
/// sequence is nullable, `trailing` (the lookahead set of the item that
/// owns this sequence) is unioned in as well.
pub fn first_of_sequence(
    sequence: &[Symbol],
    trailing: &LookaheadSet,
    first_sets: &FirstSets,
    nullable: &NullableSet,
) -> LookaheadSet {
    let mut result = LookaheadSet::new();
    for &symbol in sequence {
        if symbol.is_non_terminal() {
            result.extend(first_sets.get(&symbol).into_iter().flatten().copied());
            if nullable.contains(&symbol) {
                continue;
            }
            return result;
        } else {
            result.insert(symbol);
            return result;
        }
    }
    result.extend(trailing.iter().copied());
    result
}
