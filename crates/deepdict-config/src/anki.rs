use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What to do with a note field whose mapped value is empty
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum EmptyFieldAction {
    /// Leave the field out of the note
    Skip,
    /// Use a fixed value
    Default { default: String },
    /// Write `[No <field>]`
    #[default]
    Placeholder,
    /// Refuse to export
    Error,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AnkiConfig {
    /// Enable Anki integration
    pub enabled: bool,
    /// AnkiConnect URL
    pub url: String,
    /// Default deck name
    pub deck: String,
    /// Note type (model) name
    pub note_type: String,
    /// Note field name -> dotted path into the entry
    pub field_mappings: BTreeMap<String, String>,
    pub empty_fields: BTreeMap<String, EmptyFieldAction>,
    pub tags: Vec<String>,
}

impl AnkiConfig {
    pub fn new() -> Self {
        let field_mappings = [
            ("Word", "headword"),
            ("Definition", "meanings.0.definition"),
            ("Example", "meanings.0.examples.0.sentence"),
            ("Translation", "meanings.0.examples.0.translation"),
        ]
        .into_iter()
        .map(|(field, path)| (field.to_string(), path.to_string()))
        .collect();

        let empty_fields = BTreeMap::from([(
            "Translation".to_string(),
            EmptyFieldAction::Default {
                default: "[No translation]".to_string(),
            },
        )]);

        Self {
            enabled: false,
            url: "http://localhost:8765".to_string(),
            deck: "Language Learning".to_string(),
            note_type: "Basic".to_string(),
            field_mappings,
            empty_fields,
            tags: vec!["DeepDict".to_string()],
        }
    }
}

impl Default for AnkiConfig {
    fn default() -> Self {
        Self::new()
    }
}
