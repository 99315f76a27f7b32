use serde::{Deserialize, Serialize};

use crate::language::{LanguageSettings, SentenceContext};

/// A generated dictionary entry, in the JSON shape the model is asked for
/// and the shape stored entries are read back in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// Storage id, present once the entry has been saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub headword: String,
    #[serde(default)]
    pub part_of_speech: String,
    pub meanings: Vec<Meaning>,
    #[serde(default)]
    pub metadata: EntryMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meaning {
    pub definition: String,
    #[serde(flatten)]
    pub grammar: GrammarAttributes,
    #[serde(default)]
    pub examples: Vec<Example>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noun_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub sentence: String,
    #[serde(default)]
    pub translation: String,
    /// Set on the example that is the user's own context sentence
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_context: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    #[serde(default)]
    pub source_language: String,
    #[serde(default)]
    pub target_language: String,
    #[serde(default)]
    pub definition_language: String,
    #[serde(default)]
    pub has_context: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_sentence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl EntryMetadata {
    pub fn languages(&self) -> LanguageSettings {
        LanguageSettings {
            target_language: self.target_language.clone(),
            source_language: self.source_language.clone(),
            definition_language: self.definition_language.clone(),
        }
    }

    pub fn set_languages(&mut self, languages: &LanguageSettings) {
        self.source_language = languages.source_language.clone();
        self.target_language = languages.target_language.clone();
        self.definition_language = languages.definition_language.clone();
    }

    pub fn set_context(&mut self, context: &SentenceContext) {
        self.has_context = true;
        self.context_sentence = Some(context.sentence.clone());
        self.selected_text = Some(context.selected_text.clone());
    }

    pub fn sentence_context(&self) -> Option<SentenceContext> {
        let sentence = self.context_sentence.as_ref()?;
        let selected = self.selected_text.clone().unwrap_or_default();
        Some(SentenceContext::new(sentence.clone(), selected))
    }
}

impl DictionaryEntry {
    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.headword.clone(), &self.metadata.languages())
    }
}

/// Identity of an entry in storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    pub headword: String,
    pub source_language: String,
    pub target_language: String,
    pub definition_language: String,
}

impl EntryKey {
    pub fn new(headword: impl Into<String>, languages: &LanguageSettings) -> Self {
        Self {
            headword: headword.into(),
            source_language: languages.source_language.clone(),
            target_language: languages.target_language.clone(),
            definition_language: languages.definition_language.clone(),
        }
    }

    pub fn languages(&self) -> LanguageSettings {
        LanguageSettings {
            target_language: self.target_language.clone(),
            source_language: self.source_language.clone(),
            definition_language: self.definition_language.clone(),
        }
    }
}

impl std::fmt::Display for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} -> {}, defined in {})",
            self.headword, self.target_language, self.source_language, self.definition_language
        )
    }
}
