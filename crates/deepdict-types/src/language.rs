use serde::{Deserialize, Serialize};

/// Languages a lookup runs under.
///
/// The learner's base language doubles as the definition language, so
/// `source_language` and `definition_language` are kept equal by every
/// constructor and setter here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguageSettings {
    /// Language being learned
    pub target_language: String,
    pub source_language: String,
    pub definition_language: String,
}

impl LanguageSettings {
    pub fn new(target_language: impl Into<String>, definition_language: impl Into<String>) -> Self {
        let definition_language = definition_language.into();
        Self {
            target_language: target_language.into(),
            source_language: definition_language.clone(),
            definition_language,
        }
    }

    pub fn with_target(mut self, target_language: impl Into<String>) -> Self {
        self.target_language = target_language.into();
        self
    }

    pub fn with_definition(mut self, definition_language: impl Into<String>) -> Self {
        let definition_language = definition_language.into();
        self.source_language = definition_language.clone();
        self.definition_language = definition_language;
        self
    }
}

impl Default for LanguageSettings {
    fn default() -> Self {
        Self::new("Czech", "English")
    }
}

/// A sentence the user looked a word up from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceContext {
    pub sentence: String,
    /// The text the user actually selected inside `sentence`
    pub selected_text: String,
}

impl SentenceContext {
    pub fn new(sentence: impl Into<String>, selected_text: impl Into<String>) -> Self {
        Self {
            sentence: sentence.into(),
            selected_text: selected_text.into(),
        }
    }
}

/// Result of asking the model to standardize a language name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedLanguage {
    pub standardized_name: String,
    pub display_name: String,
}

impl ValidatedLanguage {
    /// Used when validation is unavailable: the input stands for both names.
    pub fn unchanged(name: &str) -> Self {
        Self {
            standardized_name: name.to_string(),
            display_name: name.to_string(),
        }
    }
}
