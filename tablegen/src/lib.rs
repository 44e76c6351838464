//! Top-level orchestration: `Grammar description -> CompileResult`.
//!
//! Wires the whole pipeline end to end — grammar preparation, lex-table
//! construction, parse-table construction plus state merging, then a
//! pluggable [`CodeEmitter`] — behind the single [`compile`] entry point,
//! driving the lexer/parser/codegen stages from one call and leaving the
//! CLI/file-I/O shell around it to callers.

use std::fmt::{self, Display};
use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::OwoColorize;

use tablegen_codegen::{CodeEmitter, DebugTableEmitter};
use tablegen_lexer::{build_lex_table, LexTable, LexTableError};
use tablegen_parser::{build_parse_table, item_set_core, merge_compatible_states, ParseConflictError, ParseTable};
use tablegen_prepare::{prepare_grammar, InputGrammar, PrepareError};

pub use tablegen_prepare::ExternalToken;
pub use tablegen_regex::{parse_regex, RegexError};

/// The kind half of a [`CompileError`]; `None` denotes a successful
/// compile, folding success into the same boundary type rather than
/// using a separate `Result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    None,
    InvalidRegex,
    GrammarError,
    LexConflict,
    ParseConflict,
    Cancelled,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::None => "none",
            ErrorKind::InvalidRegex => "invalid regex",
            ErrorKind::GrammarError => "grammar error",
            ErrorKind::LexConflict => "lex conflict",
            ErrorKind::ParseConflict => "parse conflict",
            ErrorKind::Cancelled => "cancelled",
        };
        write!(f, "{}", label)
    }
}

/// A pipeline failure, or the sentinel `{ type: None, .. }` value a
/// successful [`CompileResult`] carries instead of an `Option`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CompileError {
    pub fn none() -> Self {
        CompileError {
            kind: ErrorKind::None,
            message: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == ErrorKind::None
    }

    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        CompileError {
            kind,
            message: message.into(),
        }
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            return write!(f, "{}", "ok".green());
        }
        write!(f, "{}: {}", "error".red().bold(), self.message)
    }
}

impl std::error::Error for CompileError {}

impl From<RegexError> for CompileError {
    fn from(err: RegexError) -> Self {
        CompileError::new(ErrorKind::InvalidRegex, err.message)
    }
}

impl From<PrepareError> for CompileError {
    fn from(err: PrepareError) -> Self {
        CompileError::new(ErrorKind::GrammarError, err.to_string())
    }
}

impl From<LexTableError> for CompileError {
    fn from(err: LexTableError) -> Self {
        CompileError::new(ErrorKind::LexConflict, err.message)
    }
}

impl From<ParseConflictError> for CompileError {
    fn from(err: ParseConflictError) -> Self {
        let detail: Vec<String> = err
            .conflicts
            .iter()
            .map(|c| match c {
                tablegen_parser::Conflict::ShiftReduce { state, symbol } => {
                    format!("shift/reduce in state {} on {}", state, symbol)
                }
                tablegen_parser::Conflict::ReduceReduce { state, symbol } => {
                    format!("reduce/reduce in state {} on {}", state, symbol)
                }
            })
            .collect();
        CompileError::new(ErrorKind::ParseConflict, detail.join("; "))
    }
}

/// The artifact produced by [`compile`]: the emitted code blob alongside a
/// `CompileError` that is `{ type: None, .. }` on success.
#[derive(Debug, Clone)]
pub struct CompileResult {
    pub code: Vec<u8>,
    pub error: CompileError,
}

impl CompileResult {
    fn ok(code: Vec<u8>) -> Self {
        CompileResult {
            code,
            error: CompileError::none(),
        }
    }

    fn err(error: CompileError) -> Self {
        CompileResult {
            code: Vec::new(),
            error,
        }
    }
}

/// A flag a caller can hold onto and flip from another thread to request
/// that the next top-level pipeline stage abandon the compile. Checked
/// between stages only, never mid-stage: no partial table is ever exposed,
/// and no stage is interrupted part-way through its own work.
#[derive(Debug, Default)]
pub struct CancellationToken(AtomicBool);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(AtomicBool::new(false))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

macro_rules! check_cancelled {
    ($token:expr) => {
        if let Some(token) = $token {
            if token.is_cancelled() {
                return CompileResult::err(CompileError::new(ErrorKind::Cancelled, "compile cancelled"));
            }
        }
    };
}

/// Runs the full pipeline over `grammar`, emitting through `emitter`.
/// Stages run strictly in sequence with no internal concurrency; the
/// first stage to fail short-circuits the rest and its error is surfaced
/// unchanged rather than swallowed or wrapped.
pub fn compile(
    grammar: &InputGrammar,
    emitter: &dyn CodeEmitter,
    cancel: Option<&CancellationToken>,
) -> CompileResult {
    check_cancelled!(cancel);
    let (lexical_grammar, syntax_grammar) = match prepare_grammar(grammar) {
        Ok(pair) => pair,
        Err(err) => return CompileResult::err(err.into()),
    };

    check_cancelled!(cancel);
    let lex_table = match build_lex_table(&lexical_grammar) {
        Ok(table) => table,
        Err(err) => return CompileResult::err(err.into()),
    };

    check_cancelled!(cancel);
    let (mut parse_table, item_sets) = match build_parse_table(&syntax_grammar) {
        Ok(pair) => pair,
        Err(err) => return CompileResult::err(err.into()),
    };

    check_cancelled!(cancel);
    parse_table.mergeable_symbols = syntax_grammar.extra_tokens.iter().copied().collect();
    let cores: Vec<_> = item_sets.iter().map(item_set_core).collect();
    merge_compatible_states(&mut parse_table, &cores);

    check_cancelled!(cancel);
    let mut code = Vec::new();
    if let Err(err) = emitter.emit(&syntax_grammar, &lex_table, &parse_table, &mut code) {
        return CompileResult::err(CompileError::new(ErrorKind::GrammarError, err.to_string()));
    }

    CompileResult::ok(code)
}

/// Convenience wrapper that compiles with the workspace's one built-in
/// emitter ([`DebugTableEmitter`]), the way a caller reaching for a quick
/// table dump would, without wiring up a custom `CodeEmitter`.
pub fn compile_with_debug_emitter(grammar: &InputGrammar) -> CompileResult {
    compile(grammar, &DebugTableEmitter::new(), None)
}

/// Re-exposed so callers assembling an [`InputGrammar`] by hand can still
/// reach the lex table and parse table directly, e.g. for tooling that
/// wants to inspect `ParseTable`/`LexTable` without going through a
/// `CodeEmitter` at all.
pub fn build_tables(
    grammar: &InputGrammar,
) -> Result<(LexTable, ParseTable), CompileError> {
    let (lexical_grammar, syntax_grammar) = prepare_grammar(grammar)?;
    let lex_table = build_lex_table(&lexical_grammar)?;
    let (mut parse_table, item_sets) = build_parse_table(&syntax_grammar)?;
    parse_table.mergeable_symbols = syntax_grammar.extra_tokens.iter().copied().collect();
    let cores: Vec<_> = item_sets.iter().map(item_set_core).collect();
    merge_compatible_states(&mut parse_table, &cores);
    Ok((lex_table, parse_table))
}
