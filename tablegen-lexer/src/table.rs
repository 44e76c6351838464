use std::error::Error;
use std::fmt;
use std::ops::RangeInclusive;

use tablegen_automaton::{AutomatonState, StateId};
use tablegen_ir::Symbol;
use tablegen_prepare::LexicalGrammar;

use crate::alphabet::{generate_alphabet, Alphabet};
use crate::nfa::{build_nfa, LexAccept};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexTableError {
    pub message: String,
}

impl fmt::Display for LexTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for LexTableError {}

/// One DFA state: its outgoing character-range transitions and, if it is
/// an accepting state, the single token it resolves to.
#[derive(Debug, Clone)]
pub struct LexState {
    pub transitions: Vec<(RangeInclusive<u32>, usize)>,
    pub accept: Option<LexAccept>,
}

#[derive(Debug, Clone)]
pub struct LexTable {
    pub states: Vec<LexState>,
    pub start: usize,
}

/// Picks the single winning accept among several simultaneously-matching
/// token rules at one DFA state: highest precedence wins; ties prefer a
/// literal string token over a pattern token; any remaining tie is an
/// unresolvable ambiguity.
fn resolve_accepts(mut accepts: Vec<LexAccept>) -> Result<Option<LexAccept>, LexTableError> {
    if accepts.is_empty() {
        return Ok(None);
    }
    accepts.sort_by(|a, b| {
        b.precedence
            .cmp(&a.precedence)
            .then(b.is_string.cmp(&a.is_string))
    });
    if accepts.len() == 1 {
        return Ok(Some(accepts.remove(0)));
    }
    let best = &accepts[0];
    let runner_up = &accepts[1];
    if best.precedence != runner_up.precedence || best.is_string != runner_up.is_string {
        return Ok(Some(accepts.remove(0)));
    }
    Err(LexTableError {
        message: format!(
            "ambiguous token match between {} and {} (equal precedence and kind)",
            symbol_label(best.symbol),
            symbol_label(runner_up.symbol)
        ),
    })
}

fn symbol_label(symbol: Symbol) -> String {
    format!("{}", symbol)
}

fn merge_adjacent_transitions(
    alphabet: &Alphabet,
    mut transitions: Vec<(usize, usize)>,
) -> Vec<(RangeInclusive<u32>, usize)> {
    transitions.sort_by_key(|(alphabet_index, _)| *alphabet_index);
    let mut merged: Vec<(RangeInclusive<u32>, usize)> = Vec::with_capacity(transitions.len());
    for (alphabet_index, target) in transitions {
        let range = alphabet.ranges()[alphabet_index].clone();
        if let Some((last_range, last_target)) = merged.last_mut() {
            if *last_target == target && *last_range.end() + 1 == *range.start() {
                *last_range = *last_range.start()..=*range.end();
                continue;
            }
        }
        merged.push((range, target));
    }
    merged
}

/// Builds the lex table for a prepared lexical grammar: alphabet
/// partitioning, NFA construction over the rule algebra, powerset
/// construction into a DFA, then accept resolution per state.
pub fn build_lex_table(grammar: &LexicalGrammar) -> Result<LexTable, LexTableError> {
    let rules: Vec<_> = grammar.variables.iter().map(|v| v.rule.clone()).collect();
    let alphabet = generate_alphabet(&rules);
    let (entry, nfa) = build_nfa(grammar, &alphabet);
    let dfa = nfa.powerset_construction(entry);

    let mut state_ids: Vec<StateId> = Vec::new();
    let mut index_of = std::collections::HashMap::new();
    let mut accepting: std::collections::HashMap<StateId, Vec<LexAccept>> = std::collections::HashMap::new();
    for (id, state) in dfa.states() {
        index_of.insert(id, state_ids.len());
        if let AutomatonState::Accepting(accepts) = state {
            accepting.insert(id, accepts.clone());
        }
        state_ids.push(id);
    }

    let mut states = Vec::with_capacity(state_ids.len());
    for &id in &state_ids {
        let accept = match accepting.remove(&id) {
            Some(accepts) => resolve_accepts(accepts)?,
            None => None,
        };
        let raw_transitions: Vec<(usize, usize)> = dfa
            .transitions_from(id)
            .map(|(alphabet_index, target)| (*alphabet_index, index_of[&target]))
            .collect();
        states.push(LexState {
            transitions: merge_adjacent_transitions(&alphabet, raw_transitions),
            accept,
        });
    }

    let start = *index_of.get(&entry).unwrap_or(&0);
    Ok(LexTable { states, start })
}
