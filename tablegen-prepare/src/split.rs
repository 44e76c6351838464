use std::collections::HashMap;
use std::rc::Rc;

use tablegen_ir::{Rule, RuleRewriter, Symbol};

use crate::expand_repeats::expand_repeats;
use crate::flatten::flatten_rule;
use crate::grammar::{LexicalGrammar, LexicalVariable, SyntaxGrammar, SyntaxVariable};
use crate::input::{ExternalToken as InputExternalToken, InputGrammar, PrepareError};

/// Before the split, every cross-variable reference shares one namespace
/// and is tagged `Symbol::NonTerminal(i)` pointing at `variables[i]`,
/// regardless of what `variables[i]` will itself end up classified as —
/// mirroring the representation a grammar description arrives in. A
/// variable is lexical iff its rule tree contains no such reference at
/// all, i.e. it is a self-contained regex over character sets.
fn references_other_variable(rule: &Rule) -> bool {
    match rule {
        Rule::Blank | Rule::CharacterSet(_) => false,
        Rule::Symbol(_) => true,
        Rule::Choice(children) => children.iter().any(|c| references_other_variable(c)),
        Rule::Seq(left, right) => {
            references_other_variable(left) || references_other_variable(right)
        }
        Rule::Repeat(inner) => references_other_variable(inner),
        Rule::Metadata { rule, .. } => references_other_variable(rule),
    }
}

/// Renumbers a pre-split `Symbol::NonTerminal(old_index)` reference into
/// whichever post-split namespace its target landed in.
struct ResolveSplitSymbols<'a> {
    lexical_index: &'a HashMap<usize, u32>,
    syntax_index: &'a HashMap<usize, u32>,
}

impl<'a> RuleRewriter for ResolveSplitSymbols<'a> {
    fn rewrite_symbol(&mut self, symbol: Symbol) -> Rc<Rule> {
        let old_index = symbol.index as usize;
        let resolved = if let Some(&i) = self.syntax_index.get(&old_index) {
            Symbol::non_terminal(i)
        } else if let Some(&i) = self.lexical_index.get(&old_index) {
            Symbol::terminal(i)
        } else {
            symbol
        };
        Rc::new(Rule::Symbol(resolved))
    }
}

/// Splits a grammar description into its lexical half (rules the DFA
/// builder must compile) and syntax half (non-terminals flattened into
/// productions for the parse table builder), then runs repeat expansion
/// over the syntax half only — token-level `Repeat` nodes are left intact
/// for the lexer to compile as NFA loops directly.
pub fn split_grammar(input: &InputGrammar) -> Result<(LexicalGrammar, SyntaxGrammar), PrepareError> {
    let is_syntactic: Vec<bool> = input
        .variables
        .iter()
        .map(|v| references_other_variable(&v.rule))
        .collect();

    let mut lexical_index = HashMap::new();
    let mut syntax_index = HashMap::new();
    for (i, syntactic) in is_syntactic.iter().enumerate() {
        if *syntactic {
            let next = syntax_index.len() as u32;
            syntax_index.insert(i, next);
        } else {
            let next = lexical_index.len() as u32;
            lexical_index.insert(i, next);
        }
    }

    let mut lexical_variables = Vec::new();
    let mut syntax_rules: Vec<(String, tablegen_ir::VariableType, Rc<Rule>)> = Vec::new();

    for (i, variable) in input.variables.iter().enumerate() {
        let mut resolver = ResolveSplitSymbols {
            lexical_index: &lexical_index,
            syntax_index: &syntax_index,
        };
        let rewritten = resolver.rewrite(&variable.rule);
        if is_syntactic[i] {
            syntax_rules.push((variable.name.clone(), variable.kind, rewritten));
        } else {
            lexical_variables.push(LexicalVariable {
                name: variable.name.clone(),
                rule: rewritten,
                kind: variable.kind,
            });
        }
    }

    let named_rules: Vec<(String, Rc<Rule>)> = syntax_rules
        .iter()
        .map(|(name, _, rule)| (name.clone(), rule.clone()))
        .collect();
    let (expanded, aux_rules) = expand_repeats(&named_rules, 0);

    let mut syntax_variables = Vec::with_capacity(syntax_rules.len() + aux_rules.len());
    for ((_, kind, _), (name, rule)) in syntax_rules.iter().zip(expanded.into_iter()) {
        let productions = flatten_rule(&name, &rule)?;
        syntax_variables.push(SyntaxVariable {
            name,
            kind: *kind,
            productions,
        });
    }
    for (name, rule) in aux_rules {
        let productions = flatten_rule(&name, &rule)?;
        syntax_variables.push(SyntaxVariable {
            name,
            kind: tablegen_ir::VariableType::Auxiliary,
            productions,
        });
    }

    let extra_tokens = input
        .extra_tokens
        .iter()
        .map(|&i| {
            lexical_index
                .get(&i)
                .copied()
                .map(Symbol::terminal)
                .ok_or_else(|| PrepareError::ExtraTokenMustBeLexical(input.variables[i].name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let external_tokens = input
        .external_tokens
        .iter()
        .map(|ext| InputExternalToken {
            name: ext.name.clone(),
            kind: ext.kind,
            corresponding_internal_token: ext
                .corresponding_internal_token
                .and_then(|i| lexical_index.get(&i).copied())
                .map(|i| i as usize),
        })
        .collect();

    Ok((
        LexicalGrammar {
            variables: lexical_variables,
        },
        SyntaxGrammar {
            variables: syntax_variables,
            extra_tokens,
            expected_conflicts: input.expected_conflicts.clone(),
            external_tokens,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablegen_ir::{CharacterSet, Variable, VariableType};

    fn token(name: &str, c: char) -> Variable {
        let mut set = CharacterSet::new();
        set.include(c as u32);
        Variable::named(name, Rc::new(set.copy()))
    }

    #[test]
    fn a_rule_with_no_references_is_lexical() {
        let input = InputGrammar {
            variables: vec![token("a", 'a')],
            ..Default::default()
        };
        let (lexical, syntax) = split_grammar(&input).unwrap();
        assert_eq!(lexical.variables.len(), 1);
        assert!(syntax.variables.is_empty());
    }

    #[test]
    fn a_rule_referencing_another_variable_is_syntactic() {
        let a = token("a", 'a');
        let s = Variable::named("s", Rc::new(Rule::Symbol(Symbol::non_terminal(1))));
        let input = InputGrammar {
            variables: vec![s, a],
            ..Default::default()
        };
        let (lexical, syntax) = split_grammar(&input).unwrap();
        assert_eq!(lexical.variables.len(), 1);
        assert_eq!(syntax.variables.len(), 1);
    }

    #[test]
    fn extra_token_must_resolve_to_a_lexical_rule() {
        let a = token("a", 'a');
        let s = Variable::named("s", Rc::new(Rule::Symbol(Symbol::non_terminal(1))));
        let input = InputGrammar {
            variables: vec![s, a],
            extra_tokens: vec![0],
            ..Default::default()
        };
        let err = split_grammar(&input).unwrap_err();
        assert!(matches!(err, PrepareError::ExtraTokenMustBeLexical(_)));
    }

    #[test]
    fn repeats_in_syntax_rules_produce_auxiliary_variables() {
        let a = token("a", 'a');
        let s = Variable::named(
            "s",
            Rc::new(Rule::Repeat(Rc::new(Rule::Symbol(Symbol::non_terminal(1))))),
        );
        let input = InputGrammar {
            variables: vec![s, a.clone(), a],
            ..Default::default()
        };
        let (_, syntax) = split_grammar(&input).unwrap();
        assert!(syntax
            .variables
            .iter()
            .any(|v| v.kind == VariableType::Auxiliary));
    }
}
