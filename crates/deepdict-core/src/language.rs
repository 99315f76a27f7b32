use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use deepdict_llm::{ChatMessage, LanguageModel};
use deepdict_types::ValidatedLanguage;

use crate::prompt::{PromptKind, PromptTemplates, PromptVars};
use crate::response::parse_json;

const VALIDATION_SYSTEM: &str = "You are a language identification and standardization assistant.";

/// Standardizes user-typed language names ("cesky" -> "Czech")
pub struct LanguageValidator {
    model: Arc<dyn LanguageModel>,
    prompts: Arc<PromptTemplates>,
    cache: Mutex<HashMap<String, ValidatedLanguage>>,
}

impl LanguageValidator {
    pub fn new(model: Arc<dyn LanguageModel>, prompts: Arc<PromptTemplates>) -> Self {
        Self {
            model,
            prompts,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Failures return the input unchanged and are not cached
    pub async fn validate(&self, name: &str) -> ValidatedLanguage {
        let name = name.trim();
        if name.is_empty() {
            return ValidatedLanguage::unchanged(name);
        }

        if let Some(hit) = self.cached(name) {
            tracing::debug!("Language validation cache hit: {}", name);
            return hit;
        }

        let prompt = self.prompts.render(
            PromptKind::LanguageValidation,
            &PromptVars::new().set("INPUT_LANGUAGE", name),
        );
        let messages = [ChatMessage::system(VALIDATION_SYSTEM), ChatMessage::user(prompt)];

        let reply = match self.model.complete(&messages, None).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Language validation for '{}' failed: {}", name, e);
                return ValidatedLanguage::unchanged(name);
            }
        };

        let validated = match parse_json::<ValidatedLanguage>(&reply) {
            Ok(v) if !v.standardized_name.trim().is_empty() && !v.display_name.trim().is_empty() => v,
            Ok(_) => {
                tracing::warn!("Language validation for '{}' returned blank names", name);
                return ValidatedLanguage::unchanged(name);
            }
            Err(e) => {
                tracing::warn!("Unparseable language validation for '{}': {}", name, e);
                return ValidatedLanguage::unchanged(name);
            }
        };

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), validated.clone());
        validated
    }

    fn cached(&self, name: &str) -> Option<ValidatedLanguage> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}
