use std::collections::HashMap;

use serde::Serialize;

pub const UNKNOWN_LANGUAGE: &str = "Unknown Language";

pub const DEFAULT_SOURCE_LANGUAGE: &str = "en";
pub const DEFAULT_TARGET_LANGUAGE: &str = "es";

/// Language codes accepted by the translation and audio services, in display order.
const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("zh", "Chinese (Simplified)"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("ar", "Arabic"),
    ("hi", "Hindi"),
    ("ur", "Urdu"),
    ("nl", "Dutch"),
    ("sv", "Swedish"),
    ("no", "Norwegian"),
    ("da", "Danish"),
    ("fi", "Finnish"),
    ("pl", "Polish"),
    ("tr", "Turkish"),
    ("th", "Thai"),
    ("vi", "Vietnamese"),
    ("id", "Indonesian"),
    ("ms", "Malay"),
    ("tl", "Filipino"),
    ("he", "Hebrew"),
    ("fa", "Persian"),
    ("bn", "Bengali"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("mr", "Marathi"),
    ("gu", "Gujarati"),
    ("kn", "Kannada"),
    ("ml", "Malayalam"),
    ("pa", "Punjabi"),
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

/// Read-only code -> display name table.
///
/// Built once at startup and shared by reference; nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct LanguageTable {
    ordered: Vec<Language>,
    by_code: HashMap<&'static str, &'static str>,
}

impl LanguageTable {
    pub fn new() -> Self {
        let ordered: Vec<Language> = SUPPORTED_LANGUAGES
            .iter()
            .map(|&(code, name)| Language { code, name })
            .collect();
        let by_code = SUPPORTED_LANGUAGES.iter().copied().collect();
        Self { ordered, by_code }
    }

    pub fn is_supported(&self, code: &str) -> bool {
        !code.is_empty() && self.by_code.contains_key(code)
    }

    pub fn name(&self, code: &str) -> &'static str {
        self.by_code.get(code).copied().unwrap_or(UNKNOWN_LANGUAGE)
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.ordered.iter().map(|l| l.code).collect()
    }

    /// Case-insensitive substring match on code or display name.
    pub fn search(&self, query: &str) -> Vec<Language> {
        let needle = query.trim().to_lowercase();
        self.ordered
            .iter()
            .filter(|l| {
                needle.is_empty()
                    || l.name.to_lowercase().contains(&needle)
                    || l.code.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

impl Default for LanguageTable {
    fn default() -> Self {
        Self::new()
    }
}

pub fn needs_translation(source_lang: &str, target_lang: &str) -> bool {
    source_lang != target_lang
}
