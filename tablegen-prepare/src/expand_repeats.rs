use std::rc::Rc;

use tablegen_ir::{Choice, Rule, RuleRewriter, Seq, Symbol};

/// Replaces every `Repeat` node in a rule tree with a reference to a fresh
/// right-recursive auxiliary non-terminal, memoized per top-level rule by
/// structural equality of the repeat's subtree.
struct RepeatExpander<'a> {
    rule_name: &'a str,
    offset: usize,
    existing_repeats: Vec<(Rc<Rule>, Symbol)>,
    pub aux_rules: Vec<(String, Rc<Rule>)>,
}

impl<'a> RepeatExpander<'a> {
    fn new(rule_name: &'a str, offset: usize) -> Self {
        RepeatExpander {
            rule_name,
            offset,
            existing_repeats: Vec::new(),
            aux_rules: Vec::new(),
        }
    }

    fn expand_repeat(&mut self, inner: &Rc<Rule>) -> Rc<Rule> {
        let original = Rc::new(Rule::Repeat(inner.clone()));
        for (repeat, symbol) in &self.existing_repeats {
            if **repeat == *original {
                return Rc::new(Rule::Symbol(*symbol));
            }
        }

        let expanded_inner = self.rewrite(inner);
        let index = self.aux_rules.len();
        let helper_name = format!("{}_repeat{}", self.rule_name, index);
        let repeat_symbol = Symbol::auxiliary((self.offset + index) as u32);
        self.existing_repeats.push((original, repeat_symbol));

        let body = Seq::build(vec![
            expanded_inner,
            Choice::build(vec![Rc::new(Rule::Symbol(repeat_symbol)), Rc::new(Rule::Blank)]),
        ]);
        self.aux_rules.push((helper_name, body));

        Rc::new(Rule::Symbol(repeat_symbol))
    }
}

impl<'a> RuleRewriter for RepeatExpander<'a> {
    fn rewrite_repeat(&mut self, inner: &Rc<Rule>) -> Rc<Rule> {
        let symbol_ref = self.expand_repeat(inner);
        Choice::build(vec![symbol_ref, Rc::new(Rule::Blank)])
    }
}

/// Expands `Repeat` nodes across a set of top-level named rules, returning
/// the rewritten rules (in the original order) and the auxiliary rules
/// discovered along the way, indices assigned starting at `offset` and
/// stable in discovery order. Idempotent when no input rule contains a
/// `Repeat` node.
///
/// A rule whose entire top-level body *is* a bare `Repeat(inner)` expands to
/// a direct reference to the auxiliary symbol (one-or-more semantics,
/// preserved unchanged), rather than going through the generic rewrite that
/// wraps every other occurrence of `Repeat` in `Choice(symbol, Blank)` —
/// zero-or-more is only introduced at the wrap point where a `Repeat` is
/// reached as a sub-term of a larger tree.
pub fn expand_repeats(
    rules: &[(String, Rc<Rule>)],
    offset: usize,
) -> (Vec<(String, Rc<Rule>)>, Vec<(String, Rc<Rule>)>) {
    let mut rewritten = Vec::with_capacity(rules.len());
    let mut aux_rules = Vec::new();

    for (name, rule) in rules {
        let mut expander = RepeatExpander::new(name, offset + aux_rules.len());
        let expanded = match &**rule {
            Rule::Repeat(inner) => expander.expand_repeat(inner),
            _ => expander.rewrite(rule),
        };
        rewritten.push((name.clone(), expanded));
        aux_rules.extend(expander.aux_rules);
    }

    (rewritten, aux_rules)
}
