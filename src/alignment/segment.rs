use tracing::debug;

use super::types::{AlignedItem, SentenceSpan};

/// Characters that end a sentence fragment, besides whitespace
///
/// Covers CJK full-width and Latin sentence punctuation plus commas,
/// enumeration commas, semicolons and colons.
pub const SENTENCE_DELIMITERS: &[char] = &[
    '。', '？', '！', '，', '、', '；', '.', '?', '!', ',', ';', '：', ':',
];

/// Whether `c` separates sentence fragments
#[must_use]
pub fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || SENTENCE_DELIMITERS.contains(&c)
}

/// Splits text on delimiter runs, dropping empty fragments
#[must_use]
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split(is_delimiter).filter(|s| !s.is_empty()).collect()
}

/// Maps sentence fragments of `text` onto the timed items covering them
///
/// Items are consumed in order and never reused. Each sentence takes items
/// until their combined character count reaches its own; the span runs from
/// the first taken item's start to the last one's end. Items made only of
/// delimiters are passed over while a sentence has taken nothing yet. A
/// sentence that takes no items (the sequence ran out) is dropped.
///
/// No normalization is applied: only character counts are compared, so a
/// tokenization that disagrees with `text` shifts or drops sentences.
#[must_use]
pub fn segment_by_sentence(text: &str, items: &[AlignedItem]) -> Vec<SentenceSpan> {
    let mut cursor = 0;
    let mut spans = Vec::new();

    for sentence in split_sentences(text) {
        let target = sentence.chars().count();
        let mut matched = 0;
        let mut bounds: Option<(f64, f64)> = None;

        while cursor < items.len() && matched < target {
            let item = &items[cursor];
            cursor += 1;

            if bounds.is_none() && item.text.chars().all(is_delimiter) {
                continue;
            }

            let start = bounds.map_or(item.start_time, |(start, _)| start);
            bounds = Some((start, item.end_time));
            matched += item.text.chars().count();
        }

        match bounds {
            Some((start_time, end_time)) => spans.push(SentenceSpan {
                text: sentence.to_owned(),
                start_time,
                end_time,
            }),
            None => debug!(sentence = sentence, "no aligned items left, sentence dropped"),
        }
    }

    debug!(
        items = items.len(),
        consumed = cursor,
        sentences = spans.len(),
        "sentence segmentation completed"
    );

    spans
}
