//! Compiles a regex-literal string (as found in a token rule's pattern
//! field) into a [`tablegen_ir::Rule`] tree.
//!
//! The grammar is a small recursive-descent language operating on Unicode
//! scalar values one code point at a time:
//!
//! ```text
//! rule   := term ('|' term)*
//! term   := factor*
//! factor := atom ('*' | '+' | '?')?
//! atom   := '(' rule ')' | '[' char_set ']' | '.' | single_char
//! ```
//!
//! Character-level recognition (a single code point, an escape, a `-`
//! range, the `*`/`+`/`?` suffix, the charset's leading `^`) is done with
//! `nom` combinators. The delimiter-matching control flow (`(...)`,
//! `[...]`) stays a hand-driven recursive descent rather than
//! `nom::sequence::delimited`, because the exact "unmatched ..." wording
//! depends on *which* delimiter failed to close, not just that parsing
//! failed somewhere.

use std::fmt;
use std::rc::Rc;

use nom::branch::alt;
use nom::character::complete::{anychar, char as one_char};
use nom::combinator::opt;
use nom::error::Error as NomError;
use nom::sequence::preceded;
use nom::IResult;

use tablegen_ir::CharacterSet;
use tablegen_ir::{character_signed, Choice, Rule, Seq};

/// A failure to compile a regex-literal string, with the same wording the
/// underlying recursive-descent grammar has always reported for each shape
/// of unbalanced-delimiter mistake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexError {
    pub message: String,
}

impl fmt::Display for RegexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RegexError {}

fn error<T>(message: &str) -> Result<T, RegexError> {
    Err(RegexError {
        message: message.to_string(),
    })
}

type Input<'a> = &'a str;
type Parsed<'a, T> = Result<(Input<'a>, T), RegexError>;

fn char_tag<'a>(c: char, input: Input<'a>) -> IResult<Input<'a>, char, NomError<Input<'a>>> {
    one_char(c)(input)
}

fn rule(input: Input, nested: bool) -> Parsed<Rc<Rule>> {
    let mut choices = Vec::new();
    let mut rest = input;
    loop {
        if !choices.is_empty() {
            match char_tag('|', rest) {
                Ok((r, _)) => rest = r,
                Err(_) => break,
            }
        }
        let (r, t) = term(rest, nested)?;
        rest = r;
        choices.push(t);
        if rest.is_empty() {
            break;
        }
    }
    Ok((rest, Choice::build(choices)))
}

fn term(input: Input, nested: bool) -> Parsed<Rc<Rule>> {
    let mut result: Rc<Rule> = Rc::new(Rule::Blank);
    let mut rest = input;
    loop {
        match rest.chars().next() {
            Some('|') => break,
            Some(')') if nested => break,
            None => break,
            _ => {}
        }
        let (r, factor_rule) = factor(rest)?;
        rest = r;
        result = Seq::build(vec![result, factor_rule]);
        if rest.is_empty() {
            break;
        }
    }
    Ok((rest, result))
}

fn factor(input: Input) -> Parsed<Rc<Rule>> {
    let (rest, atom_rule) = atom(input)?;
    let suffix: IResult<Input, char, NomError<Input>> =
        alt((one_char('*'), one_char('+'), one_char('?')))(rest);
    match suffix {
        Ok((r, '*')) => Ok((
            r,
            Choice::build(vec![Rc::new(Rule::Repeat(atom_rule)), Rc::new(Rule::Blank)]),
        )),
        Ok((r, '+')) => Ok((r, Rc::new(Rule::Repeat(atom_rule)))),
        Ok((r, '?')) => Ok((r, Choice::build(vec![atom_rule, Rc::new(Rule::Blank)]))),
        _ => Ok((rest, atom_rule)),
    }
}

fn atom(input: Input) -> Parsed<Rc<Rule>> {
    match input.chars().next() {
        Some('(') => {
            let (rest, inner) = rule(&input[1..], true)?;
            match char_tag(')', rest) {
                Ok((r, _)) => Ok((r, inner)),
                Err(_) => error("unmatched open paren"),
            }
        }
        Some('[') => {
            let (rest, set) = char_set(&input[1..])?;
            match char_tag(']', rest) {
                Ok((r, _)) => Ok((r, Rc::new(set.copy()))),
                Err(_) => error("unmatched open square bracket"),
            }
        }
        Some(')') => error("unmatched close paren"),
        Some(']') => error("unmatched close square bracket"),
        Some('.') => {
            let mut set = CharacterSet::new();
            set.include_all();
            set.exclude('\n' as u32);
            Ok((&input[1..], Rc::new(set.copy())))
        }
        _ => {
            let (rest, set) = single_char(input)?;
            Ok((rest, Rc::new(set.copy())))
        }
    }
}

fn char_set(input: Input) -> Parsed<CharacterSet> {
    let mut result = CharacterSet::new();
    let (mut rest, negated) = match opt(one_char::<_, NomError<Input>>('^'))(input) {
        Ok((r, flag)) => (r, flag.is_some()),
        Err(_) => (input, false),
    };
    if negated {
        result.include_all();
    }
    loop {
        match rest.chars().next() {
            None | Some(']') => break,
            _ => {}
        }
        let (r, single) = single_char(rest)?;
        rest = r;
        if negated {
            result.remove_set(&single);
        } else {
            result.add_set(&single);
        }
    }
    Ok((rest, result))
}

fn single_char(input: Input) -> Parsed<CharacterSet> {
    if let Some(rest) = input.strip_prefix('\\') {
        return match anychar::<_, NomError<Input>>(rest) {
            Ok((r, escaped)) => Ok((r, escaped_char(escaped))),
            Err(_) => Ok((rest, escaped_char('\0'))),
        };
    }

    let (rest, first) = anychar::<_, NomError<Input>>(input)
        .map_err(|_| RegexError { message: "unexpected end of input".to_string() })?;

    let mut set = CharacterSet::new();
    match preceded(one_char::<_, NomError<Input>>('-'), anychar)(rest) {
        Ok((r, second)) => {
            set.include_range(first as u32, second as u32);
            Ok((r, set))
        }
        Err(_) => {
            set.include(first as u32);
            Ok((rest, set))
        }
    }
}

fn escaped_char(value: char) -> CharacterSet {
    let mut set = CharacterSet::new();
    match value {
        'a' => {
            set.include_range('a' as u32, 'z' as u32);
            set.include_range('A' as u32, 'Z' as u32);
        }
        'w' => {
            set.include_range('a' as u32, 'z' as u32);
            set.include_range('A' as u32, 'Z' as u32);
            set.include_range('0' as u32, '9' as u32);
            set.include('_' as u32);
        }
        'W' => {
            set.include_all();
            set.exclude_range('a' as u32, 'z' as u32);
            set.exclude_range('A' as u32, 'Z' as u32);
            set.exclude_range('0' as u32, '9' as u32);
            set.exclude('_' as u32);
        }
        'd' => {
            set.include_range('0' as u32, '9' as u32);
        }
        'D' => {
            set.include_all();
            set.exclude_range('0' as u32, '9' as u32);
        }
        's' => {
            set.include(' ' as u32);
            set.include('\t' as u32);
            set.include('\n' as u32);
            set.include('\r' as u32);
        }
        'S' => {
            set.include_all();
            set.exclude(' ' as u32);
            set.exclude('\t' as u32);
            set.exclude('\n' as u32);
            set.exclude('\r' as u32);
        }
        't' => {
            set.include('\t' as u32);
        }
        'n' => {
            set.include('\n' as u32);
        }
        'r' => {
            set.include('\r' as u32);
        }
        other => {
            set.include(other as u32);
        }
    }
    set
}

/// Compiles a top-level regex-literal string into a rule tree.
pub fn parse_regex(input: &str) -> Result<Rc<Rule>, RegexError> {
    let (_rest, r) = rule(input, false)?;
    Ok(r)
}

/// Builds a rule matching exactly one of `chars`, or (when `negated`) any
/// code point *not* in `chars`. Used by callers compiling literal character
/// classes outside of a regex-literal string (e.g. a bare string token).
pub fn character_class<I: IntoIterator<Item = char>>(chars: I, negated: bool) -> Rc<Rule> {
    character_signed(chars.into_iter().map(|c| c as u32), !negated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_contains(rule: &Rc<Rule>, c: char) {
        match &**rule {
            Rule::CharacterSet(set) => assert!(set.contains(c as u32), "expected set to contain {:?}", c),
            other => panic!("expected a CharacterSet rule, got {:?}", other),
        }
    }

    #[test]
    fn single_literal_char_compiles_to_a_singleton_set() {
        let rule = parse_regex("a").unwrap();
        assert_contains(&rule, 'a');
    }

    #[test]
    fn alternation_builds_a_choice() {
        let rule = parse_regex("a|b").unwrap();
        assert!(matches!(&*rule, Rule::Choice(children) if children.len() == 2));
    }

    #[test]
    fn sequence_builds_nested_seq() {
        let rule = parse_regex("ab").unwrap();
        assert!(matches!(&*rule, Rule::Seq(_, _)));
    }

    #[test]
    fn star_wraps_repeat_in_an_optional_choice() {
        let rule = parse_regex("a*").unwrap();
        match &*rule {
            Rule::Choice(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(&*children[0], Rule::Repeat(_)));
                assert!(matches!(&*children[1], Rule::Blank));
            }
            other => panic!("expected a* to desugar to a choice, got {:?}", other),
        }
    }

    #[test]
    fn plus_is_a_bare_repeat() {
        let rule = parse_regex("a+").unwrap();
        assert!(matches!(&*rule, Rule::Repeat(_)));
    }

    #[test]
    fn question_mark_is_an_optional_choice() {
        let rule = parse_regex("a?").unwrap();
        assert!(matches!(&*rule, Rule::Choice(children) if children.len() == 2));
    }

    #[test]
    fn dot_matches_everything_except_newline() {
        let rule = parse_regex(".").unwrap();
        match &*rule {
            Rule::CharacterSet(set) => {
                assert!(!set.contains('\n' as u32));
                assert!(set.contains('a' as u32));
            }
            other => panic!("expected a CharacterSet rule, got {:?}", other),
        }
    }

    #[test]
    fn char_range_compiles_to_an_inclusive_set() {
        let rule = parse_regex("[a-z]").unwrap();
        match &*rule {
            Rule::CharacterSet(set) => {
                assert!(set.contains('m' as u32));
                assert!(!set.contains('A' as u32));
            }
            other => panic!("expected a CharacterSet rule, got {:?}", other),
        }
    }

    #[test]
    fn negated_char_set_excludes_listed_chars() {
        let rule = parse_regex("[^a-z]").unwrap();
        match &*rule {
            Rule::CharacterSet(set) => {
                assert!(!set.contains('m' as u32));
                assert!(set.contains('M' as u32));
            }
            other => panic!("expected a CharacterSet rule, got {:?}", other),
        }
    }

    #[test]
    fn escape_classes_match_expected_ranges() {
        let digit = parse_regex(r"\d").unwrap();
        assert_contains(&digit, '5');
        let not_digit = parse_regex(r"\D").unwrap();
        match &*not_digit {
            Rule::CharacterSet(set) => assert!(!set.contains('5' as u32)),
            other => panic!("expected a CharacterSet rule, got {:?}", other),
        }
    }

    #[test]
    fn nested_group_compiles() {
        let rule = parse_regex("(ab)*c").unwrap();
        assert!(matches!(&*rule, Rule::Seq(_, _)));
    }

    #[test]
    fn unmatched_open_paren_is_reported() {
        let err = parse_regex("(ab").unwrap_err();
        assert_eq!(err.message, "unmatched open paren");
    }

    #[test]
    fn unmatched_close_paren_is_reported() {
        let err = parse_regex("ab)").unwrap_err();
        assert_eq!(err.message, "unmatched close paren");
    }

    #[test]
    fn unmatched_open_square_bracket_is_reported() {
        let err = parse_regex("[ab").unwrap_err();
        assert_eq!(err.message, "unmatched open square bracket");
    }

    #[test]
    fn unmatched_close_square_bracket_is_reported() {
        let err = parse_regex("ab]").unwrap_err();
        assert_eq!(err.message, "unmatched close square bracket");
    }

    #[test]
    fn first_error_short_circuits_remaining_input() {
        // the second group is never reached because the first unmatched
        // paren aborts parsing immediately
        let err = parse_regex("(a|(b").unwrap_err();
        assert_eq!(err.message, "unmatched open paren");
    }

    #[test]
    fn multibyte_code_points_are_handled_as_single_atoms() {
        let rule = parse_regex("héllo").unwrap();
        assert!(matches!(&*rule, Rule::Seq(_, _)));
    }
}
