use std::rc::Rc;

use tablegen_automaton::{Nfa, StateId};
use tablegen_ir::{Rule, Symbol};
use tablegen_prepare::LexicalGrammar;

use crate::alphabet::Alphabet;

/// What a lexical rule resolves to once its DFA reaches an accepting state.
/// Carries just enough to let [`crate::table::build_lex_table`] pick a
/// single winner when several rules accept at the same state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexAccept {
    pub symbol: Symbol,
    pub precedence: i32,
    pub is_string: bool,
}

/// Reads the precedence recorded on an outer `Metadata` wrapper, if any.
/// Absent precedence defaults to zero, matching an un-annotated token.
fn strip_metadata(rule: &Rule) -> (&Rule, i32) {
    match rule {
        Rule::Metadata { rule: inner, params } => (inner.as_ref(), if params.has_precedence {
            params.precedence
        } else {
            0
        }),
        _ => (rule, 0),
    }
}

/// True for a rule tree with no alternation or repetition: a literal
/// sequence of single-character sets (or the empty rule). Used to break
/// ties between equal-precedence accepts in favor of a literal string.
fn is_string_literal(rule: &Rule) -> bool {
    match rule {
        Rule::Blank => true,
        Rule::CharacterSet(set) => set.ranges().len() == 1 && set.ranges()[0].0 == set.ranges()[0].1,
        Rule::Seq(left, right) => is_string_literal(left) && is_string_literal(right),
        Rule::Metadata { rule, .. } => is_string_literal(rule),
        Rule::Symbol(_) | Rule::Choice(_) | Rule::Repeat(_) => false,
    }
}

/// Builds the single NFA covering every variable in a [`LexicalGrammar`]:
/// one accepting path per variable, all reachable via epsilon transitions
/// from one shared entry state. Returns the entry state and the NFA.
pub fn build_nfa(grammar: &LexicalGrammar, alphabet: &Alphabet) -> (StateId, Nfa<LexAccept, usize>) {
    let mut nfa = Nfa::new();
    let entry = nfa.add_intermediate_state();

    for (index, variable) in grammar.variables.iter().enumerate() {
        let symbol = Symbol::terminal(index as u32);
        let (stripped, precedence) = strip_metadata(&variable.rule);
        let accept = LexAccept {
            symbol,
            precedence,
            is_string: is_string_literal(stripped),
        };
        let (start, end) = build_rule(&mut nfa, alphabet, stripped);
        let final_state = nfa.add_accepting_state(accept);
        nfa.add_epsilon_transition(end, final_state);
        nfa.add_epsilon_transition(entry, start);
    }

    (entry, nfa)
}

/// Recursively compiles a rule tree into a Thompson-style fragment between
/// two fresh intermediate states, returning `(start, end)`.
fn build_rule(nfa: &mut Nfa<LexAccept, usize>, alphabet: &Alphabet, rule: &Rule) -> (StateId, StateId) {
    match rule {
        Rule::Blank => {
            let start = nfa.add_intermediate_state();
            let end = nfa.add_intermediate_state();
            nfa.add_epsilon_transition(start, end);
            (start, end)
        }
        Rule::CharacterSet(set) => {
            let start = nfa.add_intermediate_state();
            let end = nfa.add_intermediate_state();
            for &(lo, hi) in set.ranges() {
                let mut c = lo;
                while c <= hi {
                    if let Some(alphabet_index) = alphabet.find_range(c) {
                        nfa.add_transition(start, end, alphabet_index);
                        c = *alphabet.ranges()[alphabet_index].end() + 1;
                    } else {
                        c += 1;
                    }
                }
            }
            (start, end)
        }
        Rule::Symbol(_) => {
            // A lexical rule referencing another variable never survives the
            // grammar split: any rule with a `Symbol` is classified syntactic.
            unreachable!("symbol reference inside a lexical rule")
        }
        Rule::Choice(children) => {
            let start = nfa.add_intermediate_state();
            let end = nfa.add_intermediate_state();
            for child in children {
                let (child_start, child_end) = build_rule(nfa, alphabet, child);
                nfa.add_epsilon_transition(start, child_start);
                nfa.add_epsilon_transition(child_end, end);
            }
            (start, end)
        }
        Rule::Seq(left, right) => {
            let (left_start, left_end) = build_rule(nfa, alphabet, left);
            let (right_start, right_end) = build_rule(nfa, alphabet, right);
            nfa.add_epsilon_transition(left_end, right_start);
            (left_start, right_end)
        }
        Rule::Repeat(inner) => {
            // One-or-more: zero-or-more is already expressed one layer up as
            // `Choice(Repeat(x), Blank)`, so no start->end skip edge here.
            let start = nfa.add_intermediate_state();
            let end = nfa.add_intermediate_state();
            let (inner_start, inner_end) = build_rule(nfa, alphabet, inner);
            nfa.add_epsilon_transition(start, inner_start);
            nfa.add_epsilon_transition(inner_end, inner_start);
            nfa.add_epsilon_transition(inner_end, end);
            (start, end)
        }
        Rule::Metadata { rule, .. } => build_rule(nfa, alphabet, rule),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::generate_alphabet;
    use tablegen_ir::{CharacterSet, VariableType};
    use tablegen_prepare::LexicalVariable;

    fn single_char_rule(c: char) -> Rc<Rule> {
        let mut set = CharacterSet::new();
        set.include(c as u32);
        Rc::new(set.copy())
    }

    #[test]
    fn is_string_literal_true_for_plain_sequences() {
        let rule = Rule::Seq(single_char_rule('a'), single_char_rule('b'));
        assert!(is_string_literal(&rule));
    }

    #[test]
    fn is_string_literal_false_for_choice() {
        let rule = Rule::Choice(vec![single_char_rule('a'), single_char_rule('b')]);
        assert!(!is_string_literal(&rule));
    }

    #[test]
    fn build_nfa_produces_one_accept_per_variable() {
        let grammar = LexicalGrammar {
            variables: vec![
                LexicalVariable {
                    name: "a".to_string(),
                    rule: single_char_rule('a'),
                    kind: VariableType::Named,
                },
                LexicalVariable {
                    name: "b".to_string(),
                    rule: single_char_rule('b'),
                    kind: VariableType::Named,
                },
            ],
        };
        let rules: Vec<_> = grammar.variables.iter().map(|v| v.rule.clone()).collect();
        let alphabet = generate_alphabet(&rules);
        let (entry, nfa) = build_nfa(&grammar, &alphabet);
        let dfa = nfa.powerset_construction(entry);
        let accept_states = dfa
            .states()
            .filter(|(_, s)| matches!(s, tablegen_automaton::AutomatonState::Accepting(_)))
            .count();
        assert_eq!(accept_states, 2);
    }
}
