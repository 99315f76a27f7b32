use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use deepdict_config::ProfileStore;
use deepdict_llm::{ChatMessage, LanguageModel, LlmError, ProviderMetadata};
use deepdict_store::{EntryStore, SqliteStore};
use deepdict_types::{DictionaryEntry, LanguageSettings};
use tempfile::TempDir;

use crate::state::Console;

/// Model that answers with queued replies in order
#[derive(Default)]
pub struct CannedModel {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<usize>,
}

impl CannedModel {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        let model = Self::default();
        for reply in replies {
            model.replies.lock().unwrap().push_back(Ok(reply.to_string()));
        }
        Arc::new(model)
    }

    pub fn push_error(&self, error: LlmError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl LanguageModel for CannedModel {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _temperature: Option<f32>,
    ) -> Result<String, LlmError> {
        *self.calls.lock().unwrap() += 1;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::EmptyResponse))
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "canned".to_string(),
            model: "test".to_string(),
        }
    }
}

/// Console over an in-memory store and a profile in a temp dir
pub fn console(dir: &TempDir) -> (Console, Arc<SqliteStore>) {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let profile = ProfileStore::open(dir.path().join("main.json")).unwrap();
    (Console::new(profile, store.clone()), store)
}

pub fn entry_json(headword: &str, definition: &str) -> String {
    serde_json::json!({
        "headword": headword,
        "part_of_speech": "noun",
        "meanings": [{
            "definition": definition,
            "examples": [{"sentence": format!("To je {headword}."), "translation": definition}]
        }]
    })
    .to_string()
}

/// Store an entry for `headword` under `languages`
pub fn seed(store: &SqliteStore, headword: &str, definition: &str, languages: &LanguageSettings) {
    let mut entry: DictionaryEntry =
        serde_json::from_str(&entry_json(headword, definition)).unwrap();
    entry.metadata.set_languages(languages);
    store.add_entry(&entry).unwrap();
}
