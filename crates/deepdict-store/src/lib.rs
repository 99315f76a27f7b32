use deepdict_types::{DictionaryEntry, EntryKey, SentenceContext};

mod sqlite;

pub use sqlite::SqliteStore;

/// Persistent dictionary storage.
///
/// Every call is synchronous and short; callers on the worker thread use it
/// directly between model calls.
pub trait EntryStore: Send + Sync {
    fn get_entry(&self, query: &EntryQuery) -> Result<Option<DictionaryEntry>, StoreError>;

    /// Save an entry with its meanings, examples and context sentence.
    /// Returns the new storage id.
    fn add_entry(&self, entry: &DictionaryEntry) -> Result<i64, StoreError>;

    /// Returns `true` when at least one entry was removed
    fn delete_entry(&self, query: &EntryQuery) -> Result<bool, StoreError>;

    /// Swap the entry stored under `key` for `entry` in one transaction
    fn replace_entry(&self, key: &EntryKey, entry: &DictionaryEntry) -> Result<i64, StoreError>;

    fn search_entries(&self, query: &SearchQuery) -> Result<Vec<DictionaryEntry>, StoreError>;

    fn all_languages(&self) -> Result<LanguageSummary, StoreError>;

    fn get_cached_lemma(
        &self,
        word: &str,
        target_language: &str,
    ) -> Result<Option<String>, StoreError>;

    /// Insert or overwrite the lemma for `(word, target_language)`
    fn cache_lemma(&self, word: &str, lemma: &str, target_language: &str)
    -> Result<(), StoreError>;

    /// Returns the number of cached lemmas removed
    fn clear_lemma_cache(&self) -> Result<usize, StoreError>;

    fn save_sentence_context(
        &self,
        entry_id: i64,
        context: &SentenceContext,
    ) -> Result<(), StoreError>;

    /// Most recent context sentence saved for the entry
    fn get_sentence_context(&self, entry_id: i64) -> Result<Option<SentenceContext>, StoreError>;
}

/// Lookup of a single entry. A `None` language matches any language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryQuery {
    pub headword: String,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
    pub definition_language: Option<String>,
}

impl EntryQuery {
    pub fn headword(headword: impl Into<String>) -> Self {
        Self {
            headword: headword.into(),
            ..Self::default()
        }
    }
}

impl From<&EntryKey> for EntryQuery {
    fn from(key: &EntryKey) -> Self {
        Self {
            headword: key.headword.clone(),
            source_language: Some(key.source_language.clone()),
            target_language: Some(key.target_language.clone()),
            definition_language: Some(key.definition_language.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Substring of the headword
    pub term: Option<String>,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
    pub definition_language: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            term: None,
            source_language: None,
            target_language: None,
            definition_language: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Distinct languages present in stored entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageSummary {
    pub source_languages: Vec<String>,
    pub target_languages: Vec<String>,
    pub definition_languages: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Entry already exists: {0}")]
    Duplicate(String),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}
