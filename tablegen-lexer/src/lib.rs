//! DFA-based lex table construction over the rule algebra: partitions the
//! code-point space into a minimal alphabet, compiles every lexical rule
//! into one shared NFA, determinizes it via powerset construction, and
//! resolves same-state accept conflicts by precedence then literal-string
//! preference.

mod alphabet;
mod nfa;
mod table;

pub use alphabet::{generate_alphabet, Alphabet};
pub use nfa::{build_nfa, LexAccept};
pub use table::{build_lex_table, LexState, LexTable, LexTableError};
