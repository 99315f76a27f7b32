use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use deepdict_config::Config;
use deepdict_llm::{ChatMessage, LanguageModel, LlmError, ProviderMetadata};
use deepdict_store::{
    EntryQuery, EntryStore, LanguageSummary, SearchQuery, SqliteStore, StoreError,
};
use deepdict_types::{DictionaryEntry, EntryKey, SentenceContext};

use crate::queue::{JobFailure, JobOutput, UiHandoff};
use crate::service::DictionaryService;

/// Replies with queued responses in order and records every call
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<Vec<(Vec<ChatMessage>, Option<f32>)>>,
}

impl ScriptedModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, text: &str) -> &Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(&self, error: LlmError) -> &Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call(&self, index: usize) -> (Vec<ChatMessage>, Option<f32>) {
        self.calls.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f32>,
    ) -> Result<String, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((messages.to_vec(), temperature));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::ApiError("no scripted reply".to_string())))
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "scripted".to_string(),
            model: "test".to_string(),
        }
    }
}

/// In-memory store whose `add_entry` can be made to fail
pub struct FlakyStore {
    inner: SqliteStore,
    fail_adds: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: SqliteStore::open_in_memory().unwrap(),
            fail_adds: AtomicBool::new(false),
        })
    }

    pub fn fail_adds(&self, fail: bool) {
        self.fail_adds.store(fail, Ordering::SeqCst);
    }
}

impl EntryStore for FlakyStore {
    fn get_entry(&self, query: &EntryQuery) -> Result<Option<DictionaryEntry>, StoreError> {
        self.inner.get_entry(query)
    }

    fn add_entry(&self, entry: &DictionaryEntry) -> Result<i64, StoreError> {
        if self.fail_adds.load(Ordering::SeqCst) {
            return Err(StoreError::NotFound(entry.key().to_string()));
        }
        self.inner.add_entry(entry)
    }

    fn delete_entry(&self, query: &EntryQuery) -> Result<bool, StoreError> {
        self.inner.delete_entry(query)
    }

    fn replace_entry(&self, key: &EntryKey, entry: &DictionaryEntry) -> Result<i64, StoreError> {
        self.inner.replace_entry(key, entry)
    }

    fn search_entries(&self, query: &SearchQuery) -> Result<Vec<DictionaryEntry>, StoreError> {
        self.inner.search_entries(query)
    }

    fn all_languages(&self) -> Result<LanguageSummary, StoreError> {
        self.inner.all_languages()
    }

    fn get_cached_lemma(
        &self,
        word: &str,
        target_language: &str,
    ) -> Result<Option<String>, StoreError> {
        self.inner.get_cached_lemma(word, target_language)
    }

    fn cache_lemma(
        &self,
        word: &str,
        lemma: &str,
        target_language: &str,
    ) -> Result<(), StoreError> {
        self.inner.cache_lemma(word, lemma, target_language)
    }

    fn clear_lemma_cache(&self) -> Result<usize, StoreError> {
        self.inner.clear_lemma_cache()
    }

    fn save_sentence_context(
        &self,
        entry_id: i64,
        context: &SentenceContext,
    ) -> Result<(), StoreError> {
        self.inner.save_sentence_context(entry_id, context)
    }

    fn get_sentence_context(&self, entry_id: i64) -> Result<Option<SentenceContext>, StoreError> {
        self.inner.get_sentence_context(entry_id)
    }
}

pub fn service(model: Arc<ScriptedModel>, store: Arc<dyn EntryStore>) -> DictionaryService {
    DictionaryService::new(model, store, &Config::default())
}

pub fn service_with(
    model: Arc<ScriptedModel>,
    store: Arc<dyn EntryStore>,
    config: &Config,
) -> DictionaryService {
    DictionaryService::new(model, store, config)
}

/// A minimal model reply for `headword`
pub fn entry_json(headword: &str, definition: &str) -> String {
    serde_json::json!({
        "headword": headword,
        "part_of_speech": "interjection",
        "meanings": [{
            "definition": definition,
            "examples": [{"sentence": format!("{headword}!"), "translation": definition}]
        }],
        "metadata": {}
    })
    .to_string()
}

/// UI-thread context used by queue tests
#[derive(Default)]
pub struct Log {
    pub outputs: Vec<JobOutput>,
    pub failures: Vec<JobFailure>,
}

impl Log {
    pub fn delivered(&self) -> usize {
        self.outputs.len() + self.failures.len()
    }

    pub fn lemmas(&self) -> Vec<String> {
        self.outputs
            .iter()
            .filter_map(|output| match output {
                JobOutput::Lemma(lemma) => Some(lemma.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Drain on the calling thread until `count` callbacks ran or time is up
pub fn drain_until(handoff: &UiHandoff<Log>, log: &mut Log, count: usize, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while log.delivered() < count && Instant::now() < deadline {
        handoff.wait_and_drain(log, Duration::from_millis(20));
    }
}
