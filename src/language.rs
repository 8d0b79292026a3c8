//! Supported languages and the scripts their output is verified against.
//!
//! Most target languages come back from an LLM in the right script without
//! help. For the few that don't, the orchestrator switches to the
//! script-verification policy, which needs to know which Unicode range to
//! look for. That mapping is the [`ScriptTable`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Language codes offered by the CLI, with display names used in prompts.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("zh", "Chinese (Simplified)"),
    ("fr", "French"),
    ("es", "Spanish"),
    ("de", "German"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("ru", "Russian"),
    ("ar", "Arabic"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
];

/// Display name for a language code; unknown codes are returned unchanged.
pub fn language_name(code: &str) -> &str {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

/// Whether `code` is one of [`SUPPORTED_LANGUAGES`].
pub fn is_supported(code: &str) -> bool {
    SUPPORTED_LANGUAGES
        .iter()
        .any(|(c, _)| c.eq_ignore_ascii_case(code))
}

/// A writing system identified by one or more Unicode ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Script {
    /// CJK Unified Ideographs, U+4E00–U+9FFF.
    Han,
    /// Hiragana and Katakana, U+3040–U+30FF.
    Kana,
    /// Hangul syllables, U+AC00–U+D7AF.
    Hangul,
    /// Cyrillic, U+0400–U+04FF.
    Cyrillic,
    /// Arabic, U+0600–U+06FF.
    Arabic,
}

impl Script {
    fn ranges(self) -> &'static [(char, char)] {
        match self {
            Script::Han => &[('\u{4E00}', '\u{9FFF}')],
            Script::Kana => &[('\u{3040}', '\u{30FF}')],
            Script::Hangul => &[('\u{AC00}', '\u{D7AF}')],
            Script::Cyrillic => &[('\u{0400}', '\u{04FF}')],
            Script::Arabic => &[('\u{0600}', '\u{06FF}')],
        }
    }

    /// Whether `c` falls in this script's range.
    pub fn contains(self, c: char) -> bool {
        self.ranges().iter().any(|&(lo, hi)| (lo..=hi).contains(&c))
    }

    /// Whether at least one character of `text` belongs to this script.
    pub fn appears_in(self, text: &str) -> bool {
        text.chars().any(|c| self.contains(c))
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Script::Han => "Han",
            Script::Kana => "Kana",
            Script::Hangul => "Hangul",
            Script::Cyrillic => "Cyrillic",
            Script::Arabic => "Arabic",
        };
        f.write_str(name)
    }
}

/// Target languages whose output must be checked for an expected script.
///
/// The default table holds only `zh → Han`. Add entries with
/// [`ScriptTable::with`] to opt other languages into verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptTable {
    entries: BTreeMap<String, Script>,
}

impl Default for ScriptTable {
    fn default() -> Self {
        Self::empty().with("zh", Script::Han)
    }
}

impl ScriptTable {
    /// A table that verifies nothing.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add or replace the expected script for `lang`.
    pub fn with(mut self, lang: impl Into<String>, script: Script) -> Self {
        self.entries.insert(lang.into().to_ascii_lowercase(), script);
        self
    }

    /// Expected script for `lang`, if it is verified.
    pub fn lookup(&self, lang: &str) -> Option<Script> {
        self.entries.get(&lang.to_ascii_lowercase()).copied()
    }
}
