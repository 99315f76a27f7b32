use std::sync::Arc;

use async_trait::async_trait;
use deepdict_config::Config;
use deepdict_llm::LanguageModel;
use deepdict_store::{EntryQuery, EntryStore};
use deepdict_types::EntryKey;

use crate::error::JobError;
use crate::language::LanguageValidator;
use crate::lemma::LemmaResolver;
use crate::prompt::PromptTemplates;
use crate::queue::{JobExecutor, JobOutput, JobRequest};
use crate::synth::EntrySynthesizer;

/// Everything a job can ask for, wired to one model and one store
pub struct DictionaryService {
    store: Arc<dyn EntryStore>,
    lemmas: LemmaResolver,
    synthesizer: EntrySynthesizer,
    validator: LanguageValidator,
}

impl DictionaryService {
    pub fn new(model: Arc<dyn LanguageModel>, store: Arc<dyn EntryStore>, config: &Config) -> Self {
        let prompts = Arc::new(PromptTemplates::load(config.storage.prompts_dir.as_deref()));

        Self {
            lemmas: LemmaResolver::new(model.clone(), store.clone(), prompts.clone()),
            synthesizer: EntrySynthesizer::new(
                model.clone(),
                store.clone(),
                prompts.clone(),
                config.llm.entry_temperature,
                config.queue.regenerate_strategy,
            ),
            validator: LanguageValidator::new(model, prompts),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }

    pub fn lemmas(&self) -> &LemmaResolver {
        &self.lemmas
    }

    pub fn synthesizer(&self) -> &EntrySynthesizer {
        &self.synthesizer
    }

    pub fn validator(&self) -> &LanguageValidator {
        &self.validator
    }
}

#[async_trait]
impl JobExecutor for DictionaryService {
    async fn execute(&self, request: JobRequest) -> Result<JobOutput, JobError> {
        match request {
            JobRequest::Lemma {
                word,
                languages,
                sentence_context,
            } => {
                let lemma = self
                    .lemmas
                    .resolve(&word, &languages.target_language, sentence_context.as_deref())
                    .await;
                Ok(JobOutput::Lemma(lemma))
            }
            JobRequest::CreateEntry {
                headword,
                languages,
                sentence_context,
            } => {
                let key = EntryKey::new(headword.clone(), &languages);
                if let Some(existing) = self.store.get_entry(&EntryQuery::from(&key))? {
                    tracing::debug!(headword = %headword, "Entry already stored, skipping model call");
                    return Ok(JobOutput::Entry(existing));
                }

                let mut entry = self
                    .synthesizer
                    .create(&headword, &languages, sentence_context.as_ref(), None)
                    .await?;
                match self.store.add_entry(&entry) {
                    Ok(id) => entry.id = Some(id),
                    // the model normalized the headword onto an entry we already have
                    Err(e) if e.is_duplicate() => {
                        let stored = self.store.get_entry(&EntryQuery::from(&entry.key()))?;
                        if let Some(stored) = stored {
                            tracing::info!(requested = %headword, headword = %stored.headword, "Returning stored entry");
                            return Ok(JobOutput::Entry(stored));
                        }
                        return Err(e.into());
                    }
                    Err(e) => return Err(e.into()),
                }

                tracing::info!(headword = %entry.headword, id = ?entry.id, "Entry created");
                Ok(JobOutput::Entry(entry))
            }
            JobRequest::Regenerate {
                key,
                variation_seed,
            } => {
                let entry = self.synthesizer.regenerate(&key, variation_seed).await?;
                tracing::info!(headword = %entry.headword, "Entry regenerated");
                Ok(JobOutput::Entry(entry))
            }
            JobRequest::ValidateLanguage { name } => {
                Ok(JobOutput::Language(self.validator.validate(&name).await))
            }
        }
    }
}
