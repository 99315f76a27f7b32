use std::sync::Arc;

use deepdict_config::RegenerateStrategy;
use deepdict_llm::{ChatMessage, LanguageModel, LlmError};
use deepdict_store::{EntryQuery, EntryStore, StoreError};
use deepdict_types::{DictionaryEntry, EntryKey, LanguageSettings, SentenceContext};

use crate::prompt::{PromptKind, PromptTemplates, PromptVars};
use crate::response::parse_json;

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("model request failed: {0}")]
    Model(#[from] LlmError),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("model response is not a valid entry: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model response has no {0}")]
    MissingField(&'static str),
}

/// What failed after the original entry was already deleted
#[derive(Debug, thiserror::Error)]
pub enum LossCause {
    #[error("{0}")]
    Synthesis(SynthesisError),

    #[error("could not save the new entry: {0}")]
    Storage(StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum RegenerateError {
    #[error("no stored entry for {0}")]
    NotFound(String),

    #[error("could not delete the stored entry for {0}")]
    DeleteFailed(String),

    #[error("regeneration of '{headword}' failed, original entry kept: {source}")]
    Synthesis {
        headword: String,
        source: SynthesisError,
    },

    #[error("regeneration of '{headword}' failed, original entry lost: {cause}")]
    OriginalLost { headword: String, cause: LossCause },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RegenerateError {
    pub fn entry_lost(&self) -> bool {
        matches!(self, Self::OriginalLost { .. })
    }
}

/// Turns a headword into a structured entry by asking the model
pub struct EntrySynthesizer {
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn EntryStore>,
    prompts: Arc<PromptTemplates>,
    temperature: f32,
    strategy: RegenerateStrategy,
}

impl EntrySynthesizer {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        store: Arc<dyn EntryStore>,
        prompts: Arc<PromptTemplates>,
        temperature: f32,
        strategy: RegenerateStrategy,
    ) -> Self {
        Self {
            model,
            store,
            prompts,
            temperature,
            strategy,
        }
    }

    /// Generate an entry. Nothing is stored here.
    pub async fn create(
        &self,
        headword: &str,
        languages: &LanguageSettings,
        sentence_context: Option<&SentenceContext>,
        variation_messages: Option<Vec<ChatMessage>>,
    ) -> Result<DictionaryEntry, SynthesisError> {
        let vars = PromptVars::new()
            .languages(languages)
            .set("TARGET_WORD", headword);
        let system_prompt = match sentence_context {
            Some(context) => self.prompts.render(
                PromptKind::EntryWithContext,
                &vars.set("SENTENCE_CONTEXT", &context.sentence),
            ),
            None => self.prompts.render(PromptKind::Entry, &vars),
        };

        let mut messages = variation_messages.unwrap_or_default();
        messages.push(ChatMessage::system(system_prompt));
        messages.push(ChatMessage::user(headword));

        tracing::debug!(
            headword = %headword,
            target = %languages.target_language,
            definition = %languages.definition_language,
            "Requesting entry"
        );

        let reply = match self.model.complete(&messages, Some(self.temperature)).await {
            Err(LlmError::EmptyResponse) => return Err(SynthesisError::EmptyResponse),
            other => other?,
        };
        if reply.trim().is_empty() {
            return Err(SynthesisError::EmptyResponse);
        }

        let mut entry: DictionaryEntry = parse_json(&reply).inspect_err(|_| {
            tracing::debug!("Unparseable entry reply for '{}': {}", headword, reply);
        })?;

        if entry.headword.trim().is_empty() {
            return Err(SynthesisError::MissingField("headword"));
        }
        if entry.meanings.is_empty() {
            return Err(SynthesisError::MissingField("meanings"));
        }

        entry.id = None;
        entry.metadata.set_languages(languages);
        match sentence_context {
            Some(context) => entry.metadata.set_context(context),
            None => {
                entry.metadata.has_context = false;
                entry.metadata.context_sentence = None;
                entry.metadata.selected_text = None;
            }
        }

        Ok(entry)
    }

    /// Replace a stored entry with a freshly generated variation
    pub async fn regenerate(
        &self,
        key: &EntryKey,
        variation_seed: u32,
    ) -> Result<DictionaryEntry, RegenerateError> {
        let query = EntryQuery::from(key);
        if self.store.get_entry(&query)?.is_none() {
            return Err(RegenerateError::NotFound(key.to_string()));
        }

        let languages = key.languages();
        let variation = variation_messages(&key.headword, variation_seed);

        match self.strategy {
            RegenerateStrategy::DeleteFirst => {
                if !self.store.delete_entry(&query)? {
                    return Err(RegenerateError::DeleteFailed(key.to_string()));
                }
                tracing::info!(headword = %key.headword, "Deleted entry for regeneration");

                let lost = |cause: LossCause| {
                    tracing::error!(headword = %key.headword, "Regeneration failed after delete: {}", cause);
                    RegenerateError::OriginalLost {
                        headword: key.headword.clone(),
                        cause,
                    }
                };

                let mut entry = self
                    .create(&key.headword, &languages, None, Some(variation))
                    .await
                    .map_err(|e| lost(LossCause::Synthesis(e)))?;
                let id = self
                    .store
                    .add_entry(&entry)
                    .map_err(|e| lost(LossCause::Storage(e)))?;
                entry.id = Some(id);
                Ok(entry)
            }
            RegenerateStrategy::ReplaceAfterCreate => {
                let mut entry = self
                    .create(&key.headword, &languages, None, Some(variation))
                    .await
                    .map_err(|source| RegenerateError::Synthesis {
                        headword: key.headword.clone(),
                        source,
                    })?;
                let id = self.store.replace_entry(key, &entry)?;
                entry.id = Some(id);
                Ok(entry)
            }
        }
    }
}

/// System turns prepended to the entry prompt so a regenerated entry is
/// phrased differently from the one it replaces
pub fn variation_messages(headword: &str, variation_seed: u32) -> Vec<ChatMessage> {
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    vec![
        ChatMessage::system(
            "You are a dictionary entry creator focused on accuracy and educational value.",
        ),
        ChatMessage::system(format!(
            "Create a dictionary entry for '{headword}' that is linguistically accurate and pedagogically sound."
        )),
        ChatMessage::system(format!("Current time: {now}. Session ID: {variation_seed}")),
        ChatMessage::system(
            "Provide slightly different phrasings and examples while maintaining complete accuracy of meaning and usage.",
        ),
    ]
}
