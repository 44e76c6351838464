use tablegen_ir::{Production, Rule, Symbol, VariableType};
use std::rc::Rc;

use crate::input::ExternalToken;

/// One token rule destined for the lex table builder.
#[derive(Debug, Clone)]
pub struct LexicalVariable {
    pub name: String,
    pub rule: Rc<Rule>,
    pub kind: VariableType,
}

/// The token half of a prepared grammar: every rule the DFA builder must
/// account for. Symbols embedded in these rule trees (if any, e.g. a
/// token built from sub-patterns) are always `Symbol::Terminal`, renumbered
/// into this grammar's own namespace during the split.
#[derive(Debug, Clone, Default)]
pub struct LexicalGrammar {
    pub variables: Vec<LexicalVariable>,
}

impl LexicalGrammar {
    pub fn symbol_for_index(&self, index: u32) -> Symbol {
        Symbol::terminal(index)
    }
}

/// One non-terminal's alternatives, already flattened into `Production`s.
#[derive(Debug, Clone)]
pub struct SyntaxVariable {
    pub name: String,
    pub kind: VariableType,
    pub productions: Vec<Production>,
}

/// The production half of a prepared grammar: non-terminals over terminal,
/// non-terminal, external and auxiliary symbols, ready for the parse table
/// builder's item-set construction.
#[derive(Debug, Clone, Default)]
pub struct SyntaxGrammar {
    pub variables: Vec<SyntaxVariable>,
    pub extra_tokens: Vec<Symbol>,
    pub expected_conflicts: Vec<Vec<Symbol>>,
    pub external_tokens: Vec<ExternalToken>,
}

impl SyntaxGrammar {
    pub fn is_extra_token(&self, symbol: Symbol) -> bool {
        self.extra_tokens.contains(&symbol)
    }
}
