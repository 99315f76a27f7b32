use deepdict_types::LanguageSettings;
use serde::{Deserialize, Serialize};

fn default_target() -> String {
    "Czech".to_string()
}

fn default_definition() -> String {
    "English".to_string()
}

/// Languages new lookups run under
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LanguageConfig {
    #[serde(default = "default_target")]
    pub target_language: String,
    /// Also the learner's source language
    #[serde(default = "default_definition")]
    pub definition_language: String,
}

impl LanguageConfig {
    /// Snapshot handed to a job at enqueue time
    pub fn settings(&self) -> LanguageSettings {
        LanguageSettings::new(
            self.target_language.clone(),
            self.definition_language.clone(),
        )
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            target_language: default_target(),
            definition_language: default_definition(),
        }
    }
}
