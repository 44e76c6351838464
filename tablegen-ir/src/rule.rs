use std::fmt;
use std::rc::Rc;

use crate::character_set::CharacterSet;
use crate::symbol::Symbol;

/// Associativity recorded by a [`MetadataParams::associativity`] annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Associativity {
    Left,
    Right,
}

/// Precedence/associativity/visibility annotations carried by a
/// [`Rule::Metadata`] node. `is_active` marks an annotation that was
/// introduced by an in-progress precedence directive rather than one
/// already baked into a named rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MetadataParams {
    pub precedence: i32,
    pub has_precedence: bool,
    pub associativity: Option<Associativity>,
    pub is_active: bool,
    pub is_token: bool,
    pub is_main_token: bool,
}

impl MetadataParams {
    /// Merges `self` (the outer, newly-applied params) on top of
    /// `inner` (params already attached to the rule being wrapped).
    /// `is_active` is sticky: once set it survives further wrapping.
    fn merge_over(&self, inner: &MetadataParams) -> MetadataParams {
        MetadataParams {
            precedence: if self.has_precedence {
                self.precedence
            } else {
                inner.precedence
            },
            has_precedence: self.has_precedence || inner.has_precedence,
            associativity: self.associativity.or(inner.associativity),
            is_active: inner.is_active || self.is_active,
            is_token: self.is_token || inner.is_token,
            is_main_token: self.is_main_token || inner.is_main_token,
        }
    }
}

/// The rule algebra: an immutable, structurally comparable expression tree.
///
/// Children are held behind `Rc` so subtrees can be shared cheaply, but
/// equality and hashing are always structural, never pointer-based — two
/// separately built trees with the same shape compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rule {
    Blank,
    CharacterSet(CharacterSet),
    Symbol(Symbol),
    Choice(Vec<Rc<Rule>>),
    Seq(Rc<Rule>, Rc<Rule>),
    Repeat(Rc<Rule>),
    Metadata {
        rule: Rc<Rule>,
        params: MetadataParams,
    },
}

impl Rule {
    pub fn is_blank(&self) -> bool {
        matches!(self, Rule::Blank)
    }
}

/// Builds a [`Rule::Choice`], flattening nested choices and collapsing a
/// single remaining alternative down to that alternative itself.
pub struct Choice;

impl Choice {
    pub fn build(alternatives: Vec<Rc<Rule>>) -> Rc<Rule> {
        let mut flat: Vec<Rc<Rule>> = Vec::with_capacity(alternatives.len());
        for alt in alternatives {
            match &*alt {
                Rule::Choice(children) => flat.extend(children.iter().cloned()),
                _ => flat.push(alt),
            }
        }
        // drop exact structural duplicates, keeping first occurrence order
        let mut deduped: Vec<Rc<Rule>> = Vec::with_capacity(flat.len());
        for alt in flat {
            if !deduped.iter().any(|existing| **existing == *alt) {
                deduped.push(alt);
            }
        }
        match deduped.len() {
            0 => Rc::new(Rule::Blank),
            1 => deduped.into_iter().next().unwrap(),
            _ => Rc::new(Rule::Choice(deduped)),
        }
    }
}

/// Builds a left-associated [`Rule::Seq`] chain, treating `Blank` as the
/// identity element: `Seq::build([x, Blank]) == Seq::build([Blank, x]) == x`.
pub struct Seq;

impl Seq {
    pub fn build(elements: Vec<Rc<Rule>>) -> Rc<Rule> {
        let mut result: Option<Rc<Rule>> = None;
        for element in elements {
            if element.is_blank() {
                continue;
            }
            result = Some(match result {
                None => element,
                Some(acc) => Rc::new(Rule::Seq(acc, element)),
            });
        }
        result.unwrap_or_else(|| Rc::new(Rule::Blank))
    }
}

/// Builds a [`Rule::Metadata`] wrapper, merging into an existing wrapper
/// instead of nesting two of them around the same inner rule.
pub struct Metadata;

impl Metadata {
    pub fn build(rule: Rc<Rule>, params: MetadataParams) -> Rc<Rule> {
        if let Rule::Metadata {
            rule: inner_rule,
            params: inner_params,
        } = &*rule
        {
            let merged = params.merge_over(inner_params);
            Rc::new(Rule::Metadata {
                rule: inner_rule.clone(),
                params: merged,
            })
        } else {
            Rc::new(Rule::Metadata { rule, params })
        }
    }
}

/// One method per [`Rule`] variant; [`RuleRewriter`] provides the default
/// identity rebuild that transforms like `expand_repeats` specialize.
pub trait RuleVisitor<T> {
    fn visit_blank(&mut self) -> T;
    fn visit_character_set(&mut self, set: &CharacterSet) -> T;
    fn visit_symbol(&mut self, symbol: Symbol) -> T;
    fn visit_choice(&mut self, children: &[Rc<Rule>]) -> T;
    fn visit_seq(&mut self, left: &Rc<Rule>, right: &Rc<Rule>) -> T;
    fn visit_repeat(&mut self, inner: &Rc<Rule>) -> T;
    fn visit_metadata(&mut self, inner: &Rc<Rule>, params: &MetadataParams) -> T;
}

pub fn visit<T>(rule: &Rule, visitor: &mut dyn RuleVisitor<T>) -> T {
    match rule {
        Rule::Blank => visitor.visit_blank(),
        Rule::CharacterSet(set) => visitor.visit_character_set(set),
        Rule::Symbol(symbol) => visitor.visit_symbol(*symbol),
        Rule::Choice(children) => visitor.visit_choice(children),
        Rule::Seq(left, right) => visitor.visit_seq(left, right),
        Rule::Repeat(inner) => visitor.visit_repeat(inner),
        Rule::Metadata { rule, params } => visitor.visit_metadata(rule, params),
    }
}

/// Default tree-rebuilding pass. Implementors override only the variants
/// they care about; everything else falls through to an identical rebuild
/// via the `Choice`/`Seq`/`Metadata` builders, so simplifications uncovered
/// by a rewrite (e.g. a `Seq` operand collapsing to `Blank`) still apply.
pub trait RuleRewriter {
    fn rewrite(&mut self, rule: &Rc<Rule>) -> Rc<Rule> {
        match &**rule {
            Rule::Blank | Rule::CharacterSet(_) => rule.clone(),
            Rule::Symbol(symbol) => self.rewrite_symbol(*symbol),
            Rule::Choice(children) => {
                let rewritten = children.iter().map(|c| self.rewrite(c)).collect();
                Choice::build(rewritten)
            }
            Rule::Seq(left, right) => {
                let left = self.rewrite(left);
                let right = self.rewrite(right);
                Seq::build(vec![left, right])
            }
            Rule::Repeat(inner) => self.rewrite_repeat(inner),
            Rule::Metadata { rule: inner, params } => {
                let inner = self.rewrite(inner);
                Metadata::build(inner, *params)
            }
        }
    }

    /// Hook specifically for `Repeat` nodes, analogous to overriding just
    /// `apply_to(Repeat*)` on an `IdentityRuleFn`. The default preserves
    /// one-or-more semantics by rebuilding the inner rule unchanged.
    fn rewrite_repeat(&mut self, inner: &Rc<Rule>) -> Rc<Rule> {
        Rc::new(Rule::Repeat(self.rewrite(inner)))
    }

    /// Hook for `Symbol` leaves, e.g. to renumber references after a
    /// grammar-splitting or index-compaction pass.
    fn rewrite_symbol(&mut self, symbol: Symbol) -> Rc<Rule> {
        Rc::new(Rule::Symbol(symbol))
    }
}

/// Builds a `Rule::CharacterSet` rule from individual code points, mirroring
/// a single-codepoint-at-a-time character class literal.
pub fn character<I: IntoIterator<Item = u32>>(chars: I) -> Rc<Rule> {
    character_signed(chars, true)
}

/// As [`character`], but with `sign = false` the listed code points are
/// excluded from the full Unicode range instead of being the only members.
pub fn character_signed<I: IntoIterator<Item = u32>>(chars: I, sign: bool) -> Rc<Rule> {
    let mut set = CharacterSet::new();
    if sign {
        for c in chars {
            set.include(c);
        }
    } else {
        set.include_all();
        for c in chars {
            set.exclude(c);
        }
    }
    Rc::new(set.copy())
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Blank => write!(f, "ε"),
            Rule::CharacterSet(set) => write!(f, "{}", set),
            Rule::Symbol(symbol) => write!(f, "{}", symbol),
            Rule::Choice(children) => {
                write!(f, "(")?;
                for (i, c) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, ")")
            }
            Rule::Seq(left, right) => write!(f, "({} {})", left, right),
            Rule::Repeat(inner) => write!(f, "{}*", inner),
            Rule::Metadata { rule, params } => {
                write!(f, "{}", rule)?;
                if params.has_precedence {
                    write!(f, "%prec({})", params.precedence)?;
                }
                match params.associativity {
                    Some(Associativity::Left) => write!(f, "%left")?,
                    Some(Associativity::Right) => write!(f, "%right")?,
                    None => {}
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_build_flattens_nested_choices() {
        let a = Rc::new(Rule::Symbol(Symbol::terminal(0)));
        let b = Rc::new(Rule::Symbol(Symbol::terminal(1)));
        let c = Rc::new(Rule::Symbol(Symbol::terminal(2)));
        let inner = Choice::build(vec![a.clone(), b.clone()]);
        let outer = Choice::build(vec![inner, c.clone()]);
        assert_eq!(outer, Rc::new(Rule::Choice(vec![a, b, c])));
    }

    #[test]
    fn choice_build_collapses_single_alternative() {
        let a = Rc::new(Rule::Symbol(Symbol::terminal(0)));
        assert_eq!(Choice::build(vec![a.clone()]), a);
    }

    #[test]
    fn choice_build_drops_structural_duplicates() {
        let a = Rc::new(Rule::Symbol(Symbol::terminal(0)));
        let a2 = Rc::new(Rule::Symbol(Symbol::terminal(0)));
        assert_eq!(Choice::build(vec![a.clone(), a2]), a);
    }

    #[test]
    fn seq_build_treats_blank_as_identity() {
        let x = Rc::new(Rule::Symbol(Symbol::terminal(0)));
        let blank = Rc::new(Rule::Blank);
        assert_eq!(Seq::build(vec![x.clone(), blank.clone()]), x);
        assert_eq!(Seq::build(vec![blank, x.clone()]), x);
    }

    #[test]
    fn seq_build_of_only_blanks_is_blank() {
        let blank = Rc::new(Rule::Blank);
        assert_eq!(Seq::build(vec![blank.clone(), blank]), Rc::new(Rule::Blank));
    }

    #[test]
    fn metadata_build_merges_instead_of_nesting() {
        let x = Rc::new(Rule::Symbol(Symbol::terminal(0)));
        let once = Metadata::build(
            x,
            MetadataParams {
                precedence: 1,
                has_precedence: true,
                ..Default::default()
            },
        );
        let twice = Metadata::build(
            once,
            MetadataParams {
                associativity: Some(Associativity::Left),
                ..Default::default()
            },
        );
        match &*twice {
            Rule::Metadata { rule, params } => {
                assert!(!matches!(**rule, Rule::Metadata { .. }), "wrapper did not nest");
                assert_eq!(params.precedence, 1);
                assert_eq!(params.associativity, Some(Associativity::Left));
            }
            _ => panic!("expected a Metadata rule"),
        }
    }

    #[test]
    fn metadata_build_keeps_active_flag_once_set() {
        let x = Rc::new(Rule::Symbol(Symbol::terminal(0)));
        let active = Metadata::build(
            x,
            MetadataParams {
                is_active: true,
                ..Default::default()
            },
        );
        let rewrapped = Metadata::build(active, MetadataParams::default());
        match &*rewrapped {
            Rule::Metadata { params, .. } => assert!(params.is_active),
            _ => panic!("expected a Metadata rule"),
        }
    }

    #[test]
    fn to_string_agrees_with_structural_equality() {
        let a = Choice::build(vec![
            Rc::new(Rule::Symbol(Symbol::terminal(0))),
            Rc::new(Rule::Symbol(Symbol::terminal(1))),
        ]);
        let b = Choice::build(vec![
            Rc::new(Rule::Symbol(Symbol::terminal(0))),
            Rc::new(Rule::Symbol(Symbol::terminal(1))),
        ]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn character_signed_false_excludes_listed_points() {
        let rule = character_signed(['a' as u32], false);
        match &*rule {
            Rule::CharacterSet(set) => {
                assert!(!set.contains('a' as u32));
                assert!(set.contains('b' as u32));
            }
            _ => panic!("expected a CharacterSet rule"),
        }
    }
}
