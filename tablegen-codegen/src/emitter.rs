use std::io::{self, Write};

use tablegen_ir::Symbol;
use tablegen_lexer::LexTable;
use tablegen_parser::{ParseActionType, ParseTable};
use tablegen_prepare::SyntaxGrammar;

use crate::templating::Template;

const BANNER_TEMPLATE: &str =
    "=== table dump: /*{variable_count}*/ variable(s), /*{state_count}*/ parse state(s) ===\n";

/// Seam between the core pipeline and a source-emitting backend. The
/// workspace ships exactly one implementation ([`DebugTableEmitter`]); a
/// real C/Rust backend would implement this trait the same way a
/// lexer/parser code generator would implement a `LexerCodeGen`/
/// `LRParserCodeGen` pair.
pub trait CodeEmitter {
    fn emit(
        &self,
        grammar: &SyntaxGrammar,
        lex: &LexTable,
        parse: &ParseTable,
        out: &mut dyn Write,
    ) -> io::Result<()>;
}

fn production_text(grammar: &SyntaxGrammar, variable_index: usize, production_index: usize) -> String {
    let variable = &grammar.variables[variable_index];
    let production = &variable.productions[production_index];
    let rhs: Vec<String> = production
        .steps
        .iter()
        .map(|step| format!("{}", step.symbol))
        .collect();
    format!("{} -> {}", variable.name, rhs.join(" "))
}

/// Textual action/goto table dump plus a lex-table dump. Enough to
/// exercise `CompileResult` end-to-end without claiming to be a real
/// backend.
pub struct DebugTableEmitter;

impl DebugTableEmitter {
    pub fn new() -> Self {
        DebugTableEmitter
    }

    fn emit_banner(&self, grammar: &SyntaxGrammar, parse: &ParseTable, out: &mut dyn Write) -> io::Result<()> {
        let template = Template::new(BANNER_TEMPLATE);
        let mut writer = template.writer();
        let variable_count = grammar.variables.len();
        let state_count = parse.states.len();
        writer.substitute("variable_count", move |w| write!(w, "{}", variable_count));
        writer.substitute("state_count", move |w| write!(w, "{}", state_count));
        writer.write(out)
    }

    fn emit_productions(&self, grammar: &SyntaxGrammar, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "Productions:")?;
        for (vi, variable) in grammar.variables.iter().enumerate() {
            for pi in 0..variable.productions.len() {
                writeln!(out, "  {}", production_text(grammar, vi, pi))?;
            }
        }
        writeln!(out)
    }

    fn emit_lex_table(&self, lex: &LexTable, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "Lex table (start state {}):", lex.start)?;
        for (index, state) in lex.states.iter().enumerate() {
            let accept_text = match &state.accept {
                Some(accept) => format!("accept {} (prec {})", accept.symbol, accept.precedence),
                None => "-".to_string(),
            };
            writeln!(out, "  {:>3}: {}", index, accept_text)?;
            for (range, target) in &state.transitions {
                writeln!(out, "       [{}..={}] -> {}", range.start(), range.end(), target)?;
            }
        }
        writeln!(out)
    }

    fn emit_parse_table(&self, grammar: &SyntaxGrammar, parse: &ParseTable, out: &mut dyn Write) -> io::Result<()> {
        let _ = grammar;
        let symbols: Vec<Symbol> = parse.all_symbols().copied().collect();
        write!(out, "    |")?;
        for symbol in &symbols {
            write!(out, "{}|", symbol)?;
        }
        writeln!(out)?;

        for (state_index, state) in parse.states.iter().enumerate() {
            write!(out, "{:>4}|", state_index)?;
            for symbol in &symbols {
                let cell = if symbol.is_non_terminal() {
                    state
                        .nonterminal_entries
                        .get(&symbol.index)
                        .map(|target| format!("g{}", target))
                } else {
                    state.terminal_entries.get(symbol).and_then(|entry| {
                        entry.actions.last().map(|action| match action.action_type {
                            ParseActionType::Shift => format!("s{}", action.state_index.unwrap()),
                            ParseActionType::Reduce => {
                                let handle = action.production.unwrap();
                                format!("r{}.{}", handle.variable_index, handle.production_index)
                            }
                            ParseActionType::Accept => "acc".to_string(),
                            ParseActionType::Recover => "rec".to_string(),
                            ParseActionType::Error => "e".to_string(),
                        })
                    })
                };
                write!(out, "{}|", cell.unwrap_or_default())?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

impl Default for DebugTableEmitter {
    fn default() -> Self {
        DebugTableEmitter::new()
    }
}

impl CodeEmitter for DebugTableEmitter {
    fn emit(
        &self,
        grammar: &SyntaxGrammar,
        lex: &LexTable,
        parse: &ParseTable,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        self.emit_banner(grammar, parse, out)?;
        self.emit_productions(grammar, out)?;
        self.emit_lex_table(lex, out)?;
        self.emit_parse_table(grammar, parse, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablegen_ir::VariableType;
    use tablegen_prepare::SyntaxVariable;

    #[test]
    fn emits_a_header_for_an_empty_grammar() {
        let grammar = SyntaxGrammar::default();
        let lex = LexTable {
            states: Vec::new(),
            start: 0,
        };
        let parse = ParseTable::new();
        let mut out = Vec::new();
        DebugTableEmitter::new().emit(&grammar, &lex, &parse, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Productions:"));
        assert!(text.contains("Lex table"));
    }

    #[test]
    fn production_text_renders_lhs_arrow_rhs() {
        let mut production = tablegen_ir::Production::new();
        production.push(tablegen_ir::ProductionStep::new(Symbol::terminal(0)));
        let grammar = SyntaxGrammar {
            variables: vec![SyntaxVariable {
                name: "s".into(),
                kind: VariableType::Named,
                productions: vec![production],
            }],
            ..Default::default()
        };
        assert_eq!(production_text(&grammar, 0, 0), "s -> term#0");
    }
}
