use std::collections::HashMap;

use crate::language::Language;

/// CTC target built from a transcript
///
/// `tokens` follows the blank-interleaved layout the Viterbi pass expects:
/// `[blank, c1, blank, c2, blank, sep, blank, c3, blank]`. `unit_of_state`
/// maps each state back to the transcript unit its label came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSequence {
    /// Vocabulary ids per CTC state
    pub tokens: Vec<usize>,
    /// Owning unit for character states, `None` for blanks and separators
    pub unit_of_state: Vec<Option<usize>>,
    /// Unit surface text as written in the transcript
    pub units: Vec<String>,
}

impl TokenSequence {
    /// Fewest frames a CTC path through this sequence can take
    ///
    /// Every label needs a frame, and repeated adjacent labels need a blank between them.
    #[must_use]
    pub fn min_frames(&self, blank_id: usize) -> usize {
        let labels: Vec<usize> = self.tokens.iter().copied().filter(|&t| t != blank_id).collect();
        let repeats = labels.windows(2).filter(|w| w[0] == w[1]).count();
        labels.len() + repeats
    }
}

/// Characters written without inter-word spaces (Han, kana, Hangul syllables)
#[must_use]
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2FA1F}')
}

/// Splits a transcript into alignment units
///
/// Spaced languages yield whitespace-separated words with surrounding
/// punctuation trimmed. Unspaced languages yield one unit per CJK character
/// and one per run of other alphanumerics; punctuation yields nothing.
#[must_use]
pub fn split_units(transcript: &str, language: Language) -> Vec<String> {
    if !language.is_unspaced() {
        return transcript
            .split_whitespace()
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|word| !word.is_empty())
            .map(str::to_owned)
            .collect();
    }

    let mut units = Vec::new();
    let mut run = String::new();
    for c in transcript.chars() {
        if is_cjk(c) {
            flush(&mut run, &mut units);
            units.push(c.to_string());
        } else if c.is_alphanumeric() || (c == '\'' && !run.is_empty()) {
            run.push(c);
        } else {
            flush(&mut run, &mut units);
        }
    }
    flush(&mut run, &mut units);
    units
}

fn flush(run: &mut String, units: &mut Vec<String>) {
    if !run.is_empty() {
        units.push(std::mem::take(run));
    }
}

/// Builds the CTC token sequence for a transcript
///
/// Letter case follows the vocabulary: an uppercase-only vocabulary gets
/// uppercased text, anything else lowercased. Characters missing from the
/// vocabulary are skipped, and units left with no characters are dropped.
/// `word_sep_id` is inserted between units when present.
#[must_use]
pub fn build_token_sequence(
    transcript: &str,
    language: Language,
    vocab: &HashMap<char, usize>,
    blank_id: usize,
    word_sep_id: Option<usize>,
) -> TokenSequence {
    let uppercase = vocab_is_uppercase(vocab);

    let mut tokens = vec![blank_id];
    let mut unit_of_state = vec![None];
    let mut units = Vec::new();

    for surface in split_units(transcript, language) {
        let normalized = if uppercase {
            surface.to_uppercase()
        } else {
            surface.to_lowercase()
        };
        let ids: Vec<usize> = normalized.chars().filter_map(|c| vocab.get(&c).copied()).collect();

        if ids.is_empty() {
            continue;
        }

        if !units.is_empty() {
            if let Some(sep) = word_sep_id {
                tokens.push(sep);
                unit_of_state.push(None);
                tokens.push(blank_id);
                unit_of_state.push(None);
            }
        }

        let unit_index = units.len();
        for id in ids {
            tokens.push(id);
            unit_of_state.push(Some(unit_index));
            tokens.push(blank_id);
            unit_of_state.push(None);
        }
        units.push(surface);
    }

    TokenSequence {
        tokens,
        unit_of_state,
        units,
    }
}

fn vocab_is_uppercase(vocab: &HashMap<char, usize>) -> bool {
    let mut has_upper = false;
    let mut has_lower = false;
    for c in vocab.keys().copied().filter(|c| c.is_alphabetic()) {
        has_upper |= c.is_uppercase();
        has_lower |= c.is_lowercase();
    }
    has_upper && !has_lower
}
