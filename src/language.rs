use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Spoken languages accepted by the transcription and alignment nodes
///
/// `Auto` is only meaningful for transcription, where it asks the model to
/// detect the language itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// Let the model detect the language
    Auto,
    /// Mandarin Chinese
    Chinese,
    /// English
    English,
    /// Cantonese
    Cantonese,
    /// Arabic
    Arabic,
    /// German
    German,
    /// French
    French,
    /// Spanish
    Spanish,
    /// Portuguese
    Portuguese,
    /// Indonesian
    Indonesian,
    /// Italian
    Italian,
    /// Korean
    Korean,
    /// Russian
    Russian,
    /// Thai
    Thai,
    /// Vietnamese
    Vietnamese,
    /// Japanese
    Japanese,
    /// Turkish
    Turkish,
    /// Hindi
    Hindi,
    /// Malay
    Malay,
    /// Dutch
    Dutch,
    /// Swedish
    Swedish,
    /// Danish
    Danish,
    /// Finnish
    Finnish,
    /// Polish
    Polish,
    /// Czech
    Czech,
    /// Filipino
    Filipino,
    /// Persian
    Persian,
    /// Greek
    Greek,
    /// Romanian
    Romanian,
    /// Hungarian
    Hungarian,
    /// Macedonian
    Macedonian,
}

/// Languages offered by the transcribe node, in menu order
pub const TRANSCRIPTION_LANGUAGES: &[Language] = &[
    Language::Auto,
    Language::Chinese,
    Language::English,
    Language::Cantonese,
    Language::Arabic,
    Language::German,
    Language::French,
    Language::Spanish,
    Language::Portuguese,
    Language::Indonesian,
    Language::Italian,
    Language::Korean,
    Language::Russian,
    Language::Thai,
    Language::Vietnamese,
    Language::Japanese,
    Language::Turkish,
    Language::Hindi,
    Language::Malay,
    Language::Dutch,
    Language::Swedish,
    Language::Danish,
    Language::Finnish,
    Language::Polish,
    Language::Czech,
    Language::Filipino,
    Language::Persian,
    Language::Greek,
    Language::Romanian,
    Language::Hungarian,
    Language::Macedonian,
];

/// Languages offered by the forced-align node, in menu order
///
/// Only languages whose script a registered aligner vocabulary covers.
pub const ALIGNMENT_LANGUAGES: &[Language] = &[Language::English];

impl Language {
    /// Menu label shown to users
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::Chinese => "Chinese",
            Self::English => "English",
            Self::Cantonese => "Cantonese",
            Self::Arabic => "Arabic",
            Self::German => "German",
            Self::French => "French",
            Self::Spanish => "Spanish",
            Self::Portuguese => "Portuguese",
            Self::Indonesian => "Indonesian",
            Self::Italian => "Italian",
            Self::Korean => "Korean",
            Self::Russian => "Russian",
            Self::Thai => "Thai",
            Self::Vietnamese => "Vietnamese",
            Self::Japanese => "Japanese",
            Self::Turkish => "Turkish",
            Self::Hindi => "Hindi",
            Self::Malay => "Malay",
            Self::Dutch => "Dutch",
            Self::Swedish => "Swedish",
            Self::Danish => "Danish",
            Self::Finnish => "Finnish",
            Self::Polish => "Polish",
            Self::Czech => "Czech",
            Self::Filipino => "Filipino",
            Self::Persian => "Persian",
            Self::Greek => "Greek",
            Self::Romanian => "Romanian",
            Self::Hungarian => "Hungarian",
            Self::Macedonian => "Macedonian",
        }
    }

    /// ISO-639 code understood by whisper.cpp (`None` for `Auto`)
    #[must_use]
    pub const fn code(self) -> Option<&'static str> {
        let code = match self {
            Self::Auto => return None,
            Self::Chinese => "zh",
            Self::English => "en",
            Self::Cantonese => "yue",
            Self::Arabic => "ar",
            Self::German => "de",
            Self::French => "fr",
            Self::Spanish => "es",
            Self::Portuguese => "pt",
            Self::Indonesian => "id",
            Self::Italian => "it",
            Self::Korean => "ko",
            Self::Russian => "ru",
            Self::Thai => "th",
            Self::Vietnamese => "vi",
            Self::Japanese => "ja",
            Self::Turkish => "tr",
            Self::Hindi => "hi",
            Self::Malay => "ms",
            Self::Dutch => "nl",
            Self::Swedish => "sv",
            Self::Danish => "da",
            Self::Finnish => "fi",
            Self::Polish => "pl",
            Self::Czech => "cs",
            Self::Filipino => "tl",
            Self::Persian => "fa",
            Self::Greek => "el",
            Self::Romanian => "ro",
            Self::Hungarian => "hu",
            Self::Macedonian => "mk",
        };
        Some(code)
    }

    /// Reverse lookup from an ISO-639 code
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        TRANSCRIPTION_LANGUAGES
            .iter()
            .copied()
            .find(|lang| lang.code() == Some(code))
    }

    /// Whether the written language separates words with spaces
    ///
    /// Scripts without word spacing are aligned one character at a time.
    #[must_use]
    pub const fn is_unspaced(self) -> bool {
        matches!(self, Self::Chinese | Self::Cantonese | Self::Japanese)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a language label is not recognized
#[derive(Debug, thiserror::Error)]
#[error("unsupported language: {0}")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TRANSCRIPTION_LANGUAGES
            .iter()
            .copied()
            .find(|lang| lang.name().eq_ignore_ascii_case(s) || lang.code() == Some(s))
            .ok_or_else(|| UnknownLanguage(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_has_no_code() {
        assert_eq!(Language::Auto.code(), None);
        assert_eq!(Language::English.code(), Some("en"));
    }

    #[test]
    fn test_alignment_languages_are_transcribable() {
        for lang in ALIGNMENT_LANGUAGES {
            assert!(TRANSCRIPTION_LANGUAGES.contains(lang));
        }
        assert!(!ALIGNMENT_LANGUAGES.contains(&Language::Auto));
    }

    #[test]
    fn test_parse_by_name_and_code() {
        assert_eq!("Chinese".parse::<Language>().unwrap(), Language::Chinese);
        assert_eq!("english".parse::<Language>().unwrap(), Language::English);
        assert_eq!("ja".parse::<Language>().unwrap(), Language::Japanese);
        assert!("Klingon".parse::<Language>().is_err());
    }

    #[test]
    fn test_code_round_trip_covers_every_language() {
        for lang in TRANSCRIPTION_LANGUAGES.iter().skip(1) {
            let code = lang.code().unwrap();
            assert_eq!(Language::from_code(code), Some(*lang));
        }
    }

    #[test]
    fn test_unspaced_scripts() {
        assert!(Language::Chinese.is_unspaced());
        assert!(Language::Japanese.is_unspaced());
        assert!(!Language::Korean.is_unspaced());
        assert!(!Language::English.is_unspaced());
    }
}
