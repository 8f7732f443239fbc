//! Spelling suggestions from the full-text vocabulary.
//!
//! A word is corrected only when no document contains it. The replacement is
//! the vocabulary term closest in edit distance, ties broken by document
//! frequency, then alphabetically.

use levenshtein_automata::{Distance, LevenshteinAutomatonBuilder, DFA, SINK_STATE};
use std::collections::HashMap;
use tantivy::schema::Field;
use tantivy::{Searcher, Term};
use tantivy_fst::Automaton;

use crate::error::Result;

pub const MAX_EDIT_DISTANCE: u8 = 2;
/// Shorter words have too many neighbours to correct meaningfully.
pub const MIN_CORRECTABLE_LENGTH: usize = 3;

/// Walks the term dictionary along the Levenshtein DFA, visiting only
/// prefixes that can still end within the edit distance.
struct DfaAutomaton<'a>(&'a DFA);

impl Automaton for DfaAutomaton<'_> {
    type State = u32;

    fn start(&self) -> u32 {
        self.0.initial_state()
    }

    fn is_match(&self, state: &u32) -> bool {
        matches!(self.0.distance(*state), Distance::Exact(_))
    }

    fn can_match(&self, state: &u32) -> bool {
        *state != SINK_STATE
    }

    fn accept(&self, state: &u32, byte: u8) -> u32 {
        self.0.transition(*state, byte)
    }
}

/// Corrected text, or `None` when every word is known (or uncorrectable).
pub fn suggest(sources: &[(Searcher, Field)], text: &str) -> Result<Option<String>> {
    let builder = LevenshteinAutomatonBuilder::new(MAX_EDIT_DISTANCE, true);
    let mut changed = false;
    let mut words = Vec::new();
    for word in text.split_whitespace() {
        match correct_word(sources, &builder, &word.to_lowercase())? {
            Some(fixed) => {
                changed = true;
                words.push(fixed);
            }
            None => words.push(word.to_string()),
        }
    }
    Ok(changed.then(|| words.join(" ")))
}

fn correct_word(sources: &[(Searcher, Field)], builder: &LevenshteinAutomatonBuilder, word: &str) -> Result<Option<String>> {
    if word.len() < MIN_CORRECTABLE_LENGTH || !word.chars().all(char::is_alphanumeric) {
        return Ok(None);
    }
    let mut known = 0;
    for (searcher, field) in sources {
        known += searcher.doc_freq(&Term::from_field_text(*field, word))?;
    }
    if known > 0 {
        return Ok(None);
    }

    let dfa = builder.build_dfa(word);
    // term → (distance, doc frequency summed over segments)
    let mut candidates: HashMap<String, (u8, u64)> = HashMap::new();
    for (searcher, field) in sources {
        for segment in searcher.segment_readers() {
            let inverted = segment.inverted_index(*field)?;
            let mut stream = inverted.terms().search(DfaAutomaton(&dfa)).into_stream()?;
            while stream.advance() {
                let Distance::Exact(distance) = dfa.eval(stream.key()) else { continue };
                let Ok(candidate) = std::str::from_utf8(stream.key()) else { continue };
                let entry = candidates.entry(candidate.to_string()).or_insert((distance, 0));
                entry.1 += u64::from(stream.value().doc_freq);
            }
        }
    }

    let best = candidates
        .into_iter()
        .min_by(|(a_term, (a_dist, a_freq)), (b_term, (b_dist, b_freq))| {
            a_dist.cmp(b_dist).then(b_freq.cmp(a_freq)).then_with(|| a_term.cmp(b_term))
        })
        .map(|(term, _)| term);
    Ok(best)
}
