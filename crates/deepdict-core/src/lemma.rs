use std::sync::Arc;

use deepdict_llm::{ChatMessage, LanguageModel};
use deepdict_store::EntryStore;

use crate::preprocess::{DefaultPreprocessor, Preprocessor};
use crate::prompt::{PromptKind, PromptTemplates, PromptVars};
use crate::response::clean_lemma;

const LEMMA_SYSTEM: &str =
    "You are a lemmatization function inside a dictionary that must preserve multi-word expressions.";
const LEMMA_CONTEXT_SYSTEM: &str = "You are a lemmatization function that uses sentence context.";

/// Maps a surface form to its dictionary form, caching context-free results
pub struct LemmaResolver {
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn EntryStore>,
    prompts: Arc<PromptTemplates>,
}

impl LemmaResolver {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        store: Arc<dyn EntryStore>,
        prompts: Arc<PromptTemplates>,
    ) -> Self {
        Self {
            model,
            store,
            prompts,
        }
    }

    /// Never fails: any problem yields the normalized input word.
    ///
    /// With a sentence context the cache is neither read nor written.
    pub async fn resolve(
        &self,
        word: &str,
        target_language: &str,
        sentence_context: Option<&str>,
    ) -> String {
        let word = DefaultPreprocessor.process(word);
        if word.is_empty() {
            return word;
        }
        let context = sentence_context.map(str::trim).filter(|c| !c.is_empty());

        if context.is_none() {
            match self.store.get_cached_lemma(&word, target_language) {
                Ok(Some(lemma)) => {
                    tracing::debug!(word = %word, lemma = %lemma, "Lemma cache hit");
                    return lemma;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Lemma cache lookup failed for '{}': {}", word, e);
                    return word;
                }
            }
        }

        let vars = PromptVars::new()
            .set("TARGET_LANGUAGE", target_language)
            .set("TARGET_WORD", &word);
        let messages = match context {
            Some(sentence) => vec![
                ChatMessage::system(LEMMA_CONTEXT_SYSTEM),
                ChatMessage::user(self.prompts.render(
                    PromptKind::LemmaWithContext,
                    &vars.set("SENTENCE_CONTEXT", sentence),
                )),
            ],
            None => vec![
                ChatMessage::system(LEMMA_SYSTEM),
                ChatMessage::user(self.prompts.render(PromptKind::Lemma, &vars)),
            ],
        };

        let lemma = match self.model.complete(&messages, None).await {
            Ok(reply) => clean_lemma(&reply),
            Err(e) => {
                tracing::warn!("Lemmatization of '{}' failed, using the word itself: {}", word, e);
                return word;
            }
        };
        let lemma = if lemma.is_empty() { word.clone() } else { lemma };

        if context.is_some() {
            tracing::debug!(word = %word, lemma = %lemma, "Context lemma");
            return lemma;
        }

        if let Err(e) = self.store.cache_lemma(&word, &lemma, target_language) {
            tracing::warn!("Could not cache lemma '{}' -> '{}': {}", word, lemma, e);
        } else {
            tracing::debug!(word = %word, lemma = %lemma, "Cached lemma");
        }

        lemma
    }
}
