mod build;
mod first;
mod item;
mod table;

pub use build::{build_parse_table, item_set_core, merge_compatible_states, Conflict, ParseConflictError};
pub use first::{compute_first_sets, first_of_sequence, FirstSets, NullableSet};
pub use item::{
    LookaheadSet, ParseItem, ParseItemSet, ProductionHandle, AUGMENTED_PRODUCTION, AUGMENTED_VARIABLE,
};
pub use table::{ParseAction, ParseActionType, ParseState, ParseTable, ParseTableEntry, SymbolMeta};

#[cfg(test)]
mod tests {
    use super::*;
    use tablegen_ir::{Production, ProductionStep};
    use tablegen_ir::{Symbol, VariableType};
    use tablegen_prepare::SyntaxVariable;

    /// End-to-end smoke test: `s -> a s | a` over a single terminal builds a
    /// table that shifts repeatedly and accepts once input runs out.
    #[test]
    fn builds_a_table_for_simple_right_recursion() {
        let mut recursive = Production::new();
        recursive.push(ProductionStep::new(Symbol::terminal(0)));
        recursive.push(ProductionStep::new(Symbol::non_terminal(0)));
        let mut base = Production::new();
        base.push(ProductionStep::new(Symbol::terminal(0)));

        let grammar = tablegen_prepare::SyntaxGrammar {
            variables: vec![SyntaxVariable {
                name: "s".into(),
                kind: VariableType::Named,
                productions: vec![recursive, base],
            }],
            ..Default::default()
        };

        let (table, _item_sets) = build_parse_table(&grammar).expect("unambiguous grammar should build cleanly");
        assert!(table.states.len() >= 2);
        assert!(table.states[0].terminal_entries.contains_key(&Symbol::terminal(0)));
    }
}
