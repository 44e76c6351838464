use std::error::Error;
use std::fmt;

use tablegen_ir::{Symbol, Variable, VariableType};

/// A terminal implemented outside the generated lexer (e.g. a hand-written
/// scanner hook), optionally shadowing an internal token of the same shape
/// so the lexer and the external scanner agree on what symbol is produced.
#[derive(Debug, Clone)]
pub struct ExternalToken {
    pub name: String,
    pub kind: VariableType,
    pub corresponding_internal_token: Option<usize>,
}

/// The grammar description injected into the compile pipeline: an ordered
/// list of variables sharing one symbol namespace (a `Symbol::NonTerminal`
/// inside a rule refers to `variables` by position), plus the ubiquitous
/// tokens, external tokens and conflict declarations that accompany it.
#[derive(Debug, Clone, Default)]
pub struct InputGrammar {
    pub variables: Vec<Variable>,
    pub extra_tokens: Vec<usize>,
    pub external_tokens: Vec<ExternalToken>,
    pub expected_conflicts: Vec<Vec<Symbol>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareError {
    MissingSymbol(String),
    ExtraTokenMustBeLexical(String),
    EmptyStringToken(String),
    DuplicateRuleName(String),
}

impl fmt::Display for PrepareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrepareError::MissingSymbol(name) => write!(f, "undefined symbol: {}", name),
            PrepareError::ExtraTokenMustBeLexical(name) => {
                write!(f, "extra token `{}` must resolve to a lexical rule", name)
            }
            PrepareError::EmptyStringToken(name) => {
                write!(f, "token `{}` matches the empty string", name)
            }
            PrepareError::DuplicateRuleName(name) => write!(f, "duplicate rule name: {}", name),
        }
    }
}

impl Error for PrepareError {}
