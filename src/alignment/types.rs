/// One aligned unit of the transcript (a word, or a character in unspaced scripts)
#[derive(Clone, Debug, PartialEq)]
pub struct AlignedItem {
    /// Unit text as written in the transcript
    pub text: String,
    /// Start time in seconds
    pub start_time: f64,
    /// End time in seconds
    pub end_time: f64,
}

impl AlignedItem {
    /// Creates an item
    #[must_use]
    pub fn new(text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            text: text.into(),
            start_time,
            end_time,
        }
    }
}

/// A timed span of transcript text, one output row of the align node
#[derive(Clone, Debug, PartialEq)]
pub struct SentenceSpan {
    /// Sentence (or item) text
    pub text: String,
    /// Start time in seconds
    pub start_time: f64,
    /// End time in seconds
    pub end_time: f64,
}

impl From<AlignedItem> for SentenceSpan {
    fn from(item: AlignedItem) -> Self {
        Self {
            text: item.text,
            start_time: item.start_time,
            end_time: item.end_time,
        }
    }
}
