//! Grammar preparation: turns an [`InputGrammar`] description into the
//! [`LexicalGrammar`]/[`SyntaxGrammar`] pair the lex table and parse table
//! builders consume.

mod expand_repeats;
mod flatten;
mod grammar;
mod input;
mod split;

pub use expand_repeats::expand_repeats;
pub use flatten::flatten_rule;
pub use grammar::{LexicalGrammar, LexicalVariable, SyntaxGrammar, SyntaxVariable};
pub use input::{ExternalToken, InputGrammar, PrepareError};
pub use split::split_grammar;

/// Runs the full preparation pipeline: split the grammar description into
/// its lexical and syntax halves, expanding `Repeat` nodes in non-terminal
/// rules into auxiliary right-recursive productions along the way.
pub fn prepare_grammar(
    input: &InputGrammar,
) -> Result<(LexicalGrammar, SyntaxGrammar), PrepareError> {
    split_grammar(input)
}
