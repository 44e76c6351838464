use crate::rule::Associativity;
use crate::symbol::Symbol;

/// One symbol position within a flattened [`Production`], carrying the
/// precedence/associativity/alias it was annotated with at that position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductionStep {
    pub symbol: Symbol,
    pub precedence: i32,
    pub associativity: Option<Associativity>,
    pub alias: Option<String>,
}

impl ProductionStep {
    pub fn new(symbol: Symbol) -> Self {
        ProductionStep {
            symbol,
            precedence: 0,
            associativity: None,
            alias: None,
        }
    }

    pub fn with_precedence(mut self, precedence: i32, associativity: Option<Associativity>) -> Self {
        self.precedence = precedence;
        self.associativity = associativity;
        self
    }

    pub fn with_alias(mut self, alias: String) -> Self {
        self.alias = Some(alias);
        self
    }
}

/// A single right-hand side alternative, flattened from the `Seq` chain of
/// a grammar rule into the step sequence an LR item walks over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Production {
    pub steps: Vec<ProductionStep>,
}

impl Production {
    pub fn new() -> Self {
        Production { steps: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ProductionStep> {
        self.steps.get(index)
    }

    pub fn push(&mut self, step: ProductionStep) {
        self.steps.push(step);
    }

    /// Precedence of the last step, used to break shift/reduce ties for a
    /// reduce action produced by this production.
    pub fn end_precedence(&self) -> Option<(i32, Option<Associativity>)> {
        self.steps
            .last()
            .map(|step| (step.precedence, step.associativity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_production_has_no_end_precedence() {
        assert_eq!(Production::new().end_precedence(), None);
    }

    #[test]
    fn end_precedence_reflects_last_step_only() {
        let mut production = Production::new();
        production.push(ProductionStep::new(Symbol::terminal(0)).with_precedence(1, None));
        production.push(
            ProductionStep::new(Symbol::terminal(1))
                .with_precedence(5, Some(Associativity::Left)),
        );
        assert_eq!(production.end_precedence(), Some((5, Some(Associativity::Left))));
    }
}
