use tablegen_ir::{Associativity, Production, ProductionStep, Rule};

use crate::input::PrepareError;

#[derive(Debug, Clone, Copy, Default)]
struct StepContext {
    precedence: i32,
    associativity: Option<Associativity>,
}

/// Flattens a repeat-free rule tree into the set of alternative
/// `Production`s a non-terminal's rule desugars to: `Choice` contributes
/// one alternative per child, `Seq` takes the cross product of its
/// operands' alternatives, and `Metadata` updates the precedence/
/// associativity every step built underneath it carries.
pub fn flatten_rule(name: &str, rule: &Rule) -> Result<Vec<Production>, PrepareError> {
    let alternatives = flatten(name, rule, StepContext::default())?;
    Ok(alternatives
        .into_iter()
        .map(|steps| Production { steps })
        .collect())
}

fn flatten(
    name: &str,
    rule: &Rule,
    ctx: StepContext,
) -> Result<Vec<Vec<ProductionStep>>, PrepareError> {
    match rule {
        Rule::Blank => Ok(vec![Vec::new()]),
        Rule::CharacterSet(_) => Err(PrepareError::MissingSymbol(format!(
            "inline character literal in non-terminal `{}`; declare a token instead",
            name
        ))),
        Rule::Symbol(symbol) => {
            let step = ProductionStep::new(*symbol).with_precedence(ctx.precedence, ctx.associativity);
            Ok(vec![vec![step]])
        }
        Rule::Choice(children) => {
            let mut alternatives = Vec::new();
            for child in children {
                alternatives.extend(flatten(name, child, ctx)?);
            }
            Ok(alternatives)
        }
        Rule::Seq(left, right) => {
            let left_alts = flatten(name, left, ctx)?;
            let right_alts = flatten(name, right, ctx)?;
            let mut combined = Vec::with_capacity(left_alts.len() * right_alts.len());
            for left_steps in &left_alts {
                for right_steps in &right_alts {
                    let mut steps = left_steps.clone();
                    steps.extend(right_steps.iter().cloned());
                    combined.push(steps);
                }
            }
            Ok(combined)
        }
        Rule::Repeat(_) => {
            unreachable!("Repeat nodes must be expanded before a rule is flattened")
        }
        Rule::Metadata { rule: inner, params } => {
            let next_ctx = StepContext {
                precedence: if params.has_precedence {
                    params.precedence
                } else {
                    ctx.precedence
                },
                associativity: params.associativity.or(ctx.associativity),
            };
            flatten(name, inner, next_ctx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use tablegen_ir::{Choice, MetadataParams, Metadata, Seq, Symbol};

    #[test]
    fn blank_flattens_to_one_empty_production() {
        let productions = flatten_rule("S", &Rule::Blank).unwrap();
        assert_eq!(productions.len(), 1);
        assert!(productions[0].is_empty());
    }

    #[test]
    fn choice_yields_one_production_per_alternative() {
        let rule = Choice::build(vec![
            Rc::new(Rule::Symbol(Symbol::terminal(0))),
            Rc::new(Rule::Symbol(Symbol::terminal(1))),
        ]);
        let productions = flatten_rule("S", &rule).unwrap();
        assert_eq!(productions.len(), 2);
    }

    #[test]
    fn seq_takes_the_cross_product_of_its_operands() {
        let left = Choice::build(vec![
            Rc::new(Rule::Symbol(Symbol::terminal(0))),
            Rc::new(Rule::Symbol(Symbol::terminal(1))),
        ]);
        let right = Rc::new(Rule::Symbol(Symbol::terminal(2)));
        let rule = Seq::build(vec![left, right]);
        let productions = flatten_rule("S", &rule).unwrap();
        assert_eq!(productions.len(), 2);
        assert_eq!(productions[0].len(), 2);
    }

    #[test]
    fn metadata_precedence_propagates_to_every_step_underneath() {
        let inner = Seq::build(vec![
            Rc::new(Rule::Symbol(Symbol::terminal(0))),
            Rc::new(Rule::Symbol(Symbol::terminal(1))),
        ]);
        let rule = Metadata::build(
            inner,
            MetadataParams {
                precedence: 7,
                has_precedence: true,
                ..Default::default()
            },
        );
        let productions = flatten_rule("S", &rule).unwrap();
        assert_eq!(productions.len(), 1);
        for step in &productions[0].steps {
            assert_eq!(step.precedence, 7);
        }
    }

    #[test]
    fn inline_character_set_in_a_production_is_rejected() {
        let mut set = tablegen_ir::CharacterSet::new();
        set.include('a' as u32);
        let err = flatten_rule("S", &set.copy()).unwrap_err();
        assert!(matches!(err, PrepareError::MissingSymbol(_)));
    }
}
