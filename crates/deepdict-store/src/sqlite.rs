use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use deepdict_types::{
    DictionaryEntry, EntryKey, EntryMetadata, Example, GrammarAttributes, Meaning,
    SentenceContext,
};
use rusqlite::{Connection, OptionalExtension, params};

use crate::{EntryQuery, EntryStore, LanguageSummary, SearchQuery, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    headword            TEXT NOT NULL,
    part_of_speech      TEXT,
    source_language     TEXT,
    target_language     TEXT,
    definition_language TEXT,
    has_context         INTEGER NOT NULL DEFAULT 0,
    created_at          TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(headword, source_language, target_language, definition_language)
);

CREATE TABLE IF NOT EXISTS meanings (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id    INTEGER NOT NULL,
    definition  TEXT,
    noun_type   TEXT,
    verb_type   TEXT,
    comparison  TEXT,
    FOREIGN KEY(entry_id) REFERENCES entries(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS examples (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    meaning_id          INTEGER NOT NULL,
    sentence            TEXT,
    translation         TEXT,
    is_context_sentence INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY(meaning_id) REFERENCES meanings(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS lemma_cache (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    word            TEXT NOT NULL,
    lemma           TEXT NOT NULL,
    target_language TEXT NOT NULL,
    created_at      TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(word, target_language)
);

CREATE TABLE IF NOT EXISTS sentence_contexts (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id      INTEGER NOT NULL,
    sentence      TEXT NOT NULL,
    selected_text TEXT NOT NULL,
    created_at    TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY(entry_id) REFERENCES entries(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_headword ON entries(headword);
CREATE INDEX IF NOT EXISTS idx_target_language ON entries(target_language);
CREATE INDEX IF NOT EXISTS idx_lemma_word ON lemma_cache(word, target_language);
CREATE INDEX IF NOT EXISTS idx_entry_sentence ON sentence_contexts(entry_id);
"#;

const MATCH_ENTRY: &str = "headword = ?1
    AND (source_language = ?2 OR ?2 IS NULL)
    AND (target_language = ?3 OR ?3 IS NULL)
    AND (definition_language = ?4 OR ?4 IS NULL)";

/// SQLite-backed [`EntryStore`]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")?;
        tracing::info!("Opened dictionary database {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// A panic while holding the connection leaves it usable; every write
    /// runs in a transaction that rolls back on drop.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EntryStore for SqliteStore {
    fn get_entry(&self, query: &EntryQuery) -> Result<Option<DictionaryEntry>, StoreError> {
        let conn = self.lock();
        let id: Option<i64> = conn
            .query_row(
                &format!("SELECT id FROM entries WHERE {MATCH_ENTRY} ORDER BY id LIMIT 1"),
                params![
                    query.headword,
                    query.source_language,
                    query.target_language,
                    query.definition_language
                ],
                |row| row.get(0),
            )
            .optional()?;

        match id {
            Some(id) => load_entry(&conn, id).map(Some),
            None => Ok(None),
        }
    }

    fn add_entry(&self, entry: &DictionaryEntry) -> Result<i64, StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let id = insert_entry(&tx, entry)?;
        tx.commit()?;

        tracing::debug!("Stored entry {} as #{}", entry.key(), id);
        Ok(id)
    }

    fn delete_entry(&self, query: &EntryQuery) -> Result<bool, StoreError> {
        let conn = self.lock();
        let removed = conn.execute(
            &format!("DELETE FROM entries WHERE {MATCH_ENTRY}"),
            params![
                query.headword,
                query.source_language,
                query.target_language,
                query.definition_language
            ],
        )?;

        tracing::debug!("Deleted {} entries for '{}'", removed, query.headword);
        Ok(removed > 0)
    }

    fn replace_entry(&self, key: &EntryKey, entry: &DictionaryEntry) -> Result<i64, StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let removed = tx.execute(
            &format!("DELETE FROM entries WHERE {MATCH_ENTRY}"),
            params![
                key.headword,
                key.source_language,
                key.target_language,
                key.definition_language
            ],
        )?;
        if removed == 0 {
            return Err(StoreError::NotFound(key.to_string()));
        }

        let id = insert_entry(&tx, entry)?;
        tx.commit()?;
        Ok(id)
    }

    fn search_entries(&self, query: &SearchQuery) -> Result<Vec<DictionaryEntry>, StoreError> {
        let conn = self.lock();
        let pattern = query.term.as_ref().map(|term| format!("%{term}%"));

        let mut stmt = conn.prepare(
            "SELECT id FROM entries
             WHERE (headword LIKE ?1 OR ?1 IS NULL)
             AND (source_language = ?2 OR ?2 IS NULL)
             AND (target_language = ?3 OR ?3 IS NULL)
             AND (definition_language = ?4 OR ?4 IS NULL)
             ORDER BY created_at DESC, id DESC
             LIMIT ?5 OFFSET ?6",
        )?;
        let ids = stmt
            .query_map(
                params![
                    pattern,
                    query.source_language,
                    query.target_language,
                    query.definition_language,
                    query.limit as i64,
                    query.offset as i64
                ],
                |row| row.get::<_, i64>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        ids.into_iter().map(|id| load_entry(&conn, id)).collect()
    }

    fn all_languages(&self) -> Result<LanguageSummary, StoreError> {
        let conn = self.lock();
        Ok(LanguageSummary {
            source_languages: distinct(&conn, "source_language")?,
            target_languages: distinct(&conn, "target_language")?,
            definition_languages: distinct(&conn, "definition_language")?,
        })
    }

    fn get_cached_lemma(
        &self,
        word: &str,
        target_language: &str,
    ) -> Result<Option<String>, StoreError> {
        let conn = self.lock();
        let lemma = conn
            .query_row(
                "SELECT lemma FROM lemma_cache WHERE word = ?1 AND target_language = ?2",
                params![word.to_lowercase(), target_language],
                |row| row.get(0),
            )
            .optional()?;
        Ok(lemma)
    }

    fn cache_lemma(
        &self,
        word: &str,
        lemma: &str,
        target_language: &str,
    ) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO lemma_cache (word, lemma, target_language) VALUES (?1, ?2, ?3)
             ON CONFLICT(word, target_language) DO UPDATE SET lemma = excluded.lemma",
            params![word.to_lowercase(), lemma, target_language],
        )?;
        Ok(())
    }

    fn clear_lemma_cache(&self) -> Result<usize, StoreError> {
        let conn = self.lock();
        let removed = conn.execute("DELETE FROM lemma_cache", [])?;
        tracing::info!("Cleared {} cached lemmas", removed);
        Ok(removed)
    }

    fn save_sentence_context(
        &self,
        entry_id: i64,
        context: &SentenceContext,
    ) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO sentence_contexts (entry_id, sentence, selected_text) VALUES (?1, ?2, ?3)",
            params![entry_id, context.sentence, context.selected_text],
        )?;
        Ok(())
    }

    fn get_sentence_context(&self, entry_id: i64) -> Result<Option<SentenceContext>, StoreError> {
        let conn = self.lock();
        latest_context(&conn, entry_id)
    }
}

fn insert_entry(conn: &Connection, entry: &DictionaryEntry) -> Result<i64, StoreError> {
    let metadata = &entry.metadata;
    let inserted = conn.execute(
        "INSERT INTO entries
         (headword, part_of_speech, source_language, target_language, definition_language, has_context)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.headword,
            entry.part_of_speech,
            metadata.source_language,
            metadata.target_language,
            metadata.definition_language,
            metadata.context_sentence.is_some()
        ],
    );
    if let Err(e) = inserted {
        return Err(if is_unique_violation(&e) {
            StoreError::Duplicate(entry.key().to_string())
        } else {
            e.into()
        });
    }
    let entry_id = conn.last_insert_rowid();

    for meaning in &entry.meanings {
        conn.execute(
            "INSERT INTO meanings (entry_id, definition, noun_type, verb_type, comparison)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry_id,
                meaning.definition,
                meaning.grammar.noun_type,
                meaning.grammar.verb_type,
                meaning.grammar.comparison
            ],
        )?;
        let meaning_id = conn.last_insert_rowid();

        for example in &meaning.examples {
            conn.execute(
                "INSERT INTO examples (meaning_id, sentence, translation, is_context_sentence)
                 VALUES (?1, ?2, ?3, ?4)",
                params![meaning_id, example.sentence, example.translation, example.is_context],
            )?;
        }
    }

    if let Some(context) = metadata.sentence_context() {
        let selected = if context.selected_text.is_empty() {
            entry.headword.as_str()
        } else {
            context.selected_text.as_str()
        };
        conn.execute(
            "INSERT INTO sentence_contexts (entry_id, sentence, selected_text) VALUES (?1, ?2, ?3)",
            params![entry_id, context.sentence, selected],
        )?;
    }

    Ok(entry_id)
}

fn load_entry(conn: &Connection, id: i64) -> Result<DictionaryEntry, StoreError> {
    let (headword, part_of_speech, mut metadata) = conn.query_row(
        "SELECT headword, part_of_speech, source_language, target_language,
                definition_language, has_context, created_at
         FROM entries WHERE id = ?1",
        params![id],
        |row| {
            let metadata = EntryMetadata {
                source_language: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                target_language: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                definition_language: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                has_context: row.get(5)?,
                created_at: row.get(6)?,
                ..EntryMetadata::default()
            };
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                metadata,
            ))
        },
    )?;

    let mut stmt = conn.prepare(
        "SELECT id, definition, noun_type, verb_type, comparison
         FROM meanings WHERE entry_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map(params![id], |row| {
            let meaning = Meaning {
                definition: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                grammar: GrammarAttributes {
                    noun_type: non_empty(row.get(2)?),
                    verb_type: non_empty(row.get(3)?),
                    comparison: non_empty(row.get(4)?),
                },
                examples: Vec::new(),
            };
            Ok((row.get::<_, i64>(0)?, meaning))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut meanings = Vec::with_capacity(rows.len());
    for (meaning_id, mut meaning) in rows {
        meaning.examples = load_examples(conn, meaning_id)?;
        meanings.push(meaning);
    }

    if let Some(context) = latest_context(conn, id)? {
        metadata.set_context(&context);
    }

    Ok(DictionaryEntry {
        id: Some(id),
        headword,
        part_of_speech,
        meanings,
        metadata,
    })
}

fn load_examples(conn: &Connection, meaning_id: i64) -> Result<Vec<Example>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT sentence, translation, is_context_sentence
         FROM examples WHERE meaning_id = ?1 ORDER BY id",
    )?;
    let examples = stmt
        .query_map(params![meaning_id], |row| {
            Ok(Example {
                sentence: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                translation: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                is_context: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(examples)
}

fn latest_context(conn: &Connection, entry_id: i64) -> Result<Option<SentenceContext>, StoreError> {
    let context = conn
        .query_row(
            "SELECT sentence, selected_text FROM sentence_contexts
             WHERE entry_id = ?1 ORDER BY created_at DESC, id DESC LIMIT 1",
            params![entry_id],
            |row| Ok(SentenceContext::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;
    Ok(context)
}

fn distinct(conn: &Connection, column: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT DISTINCT {column} FROM entries
         WHERE {column} IS NOT NULL AND {column} != '' ORDER BY {column}"
    ))?;
    let values = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(values)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use deepdict_types::LanguageSettings;

    use super::*;

    fn entry(headword: &str, languages: &LanguageSettings) -> DictionaryEntry {
        let mut metadata = EntryMetadata::default();
        metadata.set_languages(languages);
        DictionaryEntry {
            id: None,
            headword: headword.to_string(),
            part_of_speech: "noun".to_string(),
            meanings: vec![
                Meaning {
                    definition: "first".to_string(),
                    grammar: GrammarAttributes {
                        noun_type: Some("feminine".to_string()),
                        ..GrammarAttributes::default()
                    },
                    examples: vec![
                        Example {
                            sentence: "Jedna.".to_string(),
                            translation: "One.".to_string(),
                            is_context: false,
                        },
                        Example {
                            sentence: "Dva.".to_string(),
                            translation: "Two.".to_string(),
                            is_context: false,
                        },
                    ],
                },
                Meaning {
                    definition: "second".to_string(),
                    ..Meaning::default()
                },
            ],
            metadata,
        }
    }

    fn czech() -> LanguageSettings {
        LanguageSettings::new("Czech", "English")
    }

    fn count(store: &SqliteStore, table: &str) -> i64 {
        let conn = store.lock();
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_add_and_get_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let original = entry("kniha", &czech());

        let id = store.add_entry(&original).unwrap();
        let loaded = store
            .get_entry(&EntryQuery::from(&original.key()))
            .unwrap()
            .unwrap();

        assert_eq!(loaded.id, Some(id));
        assert_eq!(loaded.headword, "kniha");
        assert_eq!(loaded.meanings.len(), 2);
        assert_eq!(loaded.meanings[0].examples[1].sentence, "Dva.");
        assert_eq!(loaded.meanings[0].grammar.noun_type.as_deref(), Some("feminine"));
        assert_eq!(loaded.meanings[1].grammar, GrammarAttributes::default());
        assert_eq!(loaded.metadata.target_language, "Czech");
        assert!(loaded.metadata.created_at.is_some());
    }

    #[test]
    fn test_language_filters_are_optional() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.add_entry(&entry("pan", &czech())).unwrap();
        store
            .add_entry(&entry("pan", &LanguageSettings::new("Polish", "English")))
            .unwrap();

        assert!(store.get_entry(&EntryQuery::headword("pan")).unwrap().is_some());

        let query = EntryQuery {
            target_language: Some("Polish".to_string()),
            ..EntryQuery::headword("pan")
        };
        let found = store.get_entry(&query).unwrap().unwrap();
        assert_eq!(found.metadata.target_language, "Polish");

        let query = EntryQuery {
            target_language: Some("Spanish".to_string()),
            ..EntryQuery::headword("pan")
        };
        assert!(store.get_entry(&query).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.add_entry(&entry("kniha", &czech())).unwrap();

        let err = store.add_entry(&entry("kniha", &czech())).unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(count(&store, "entries"), 1);
        assert_eq!(count(&store, "meanings"), 2);
    }

    #[test]
    fn test_delete_cascades() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut original = entry("kniha", &czech());
        original
            .metadata
            .set_context(&SentenceContext::new("Čtu knihu.", "knihu"));
        store.add_entry(&original).unwrap();
        assert_eq!(count(&store, "sentence_contexts"), 1);

        assert!(store.delete_entry(&EntryQuery::from(&original.key())).unwrap());
        assert!(!store.delete_entry(&EntryQuery::from(&original.key())).unwrap());

        for table in ["entries", "meanings", "examples", "sentence_contexts"] {
            assert_eq!(count(&store, table), 0, "{table} not emptied");
        }
    }

    #[test]
    fn test_context_sentence_is_loaded_with_entry() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut original = entry("knihu", &czech());
        original
            .metadata
            .set_context(&SentenceContext::new("Čtu knihu.", ""));
        let id = store.add_entry(&original).unwrap();

        let loaded = store.get_entry(&EntryQuery::headword("knihu")).unwrap().unwrap();
        assert!(loaded.metadata.has_context);
        assert_eq!(loaded.metadata.context_sentence.as_deref(), Some("Čtu knihu."));
        // blank selection falls back to the headword
        assert_eq!(loaded.metadata.selected_text.as_deref(), Some("knihu"));

        store
            .save_sentence_context(id, &SentenceContext::new("Mám knihu.", "knihu"))
            .unwrap();
        let latest = store.get_sentence_context(id).unwrap().unwrap();
        assert_eq!(latest.sentence, "Mám knihu.");
    }

    #[test]
    fn test_replace_entry_swaps_atomically() {
        let store = SqliteStore::open_in_memory().unwrap();
        let original = entry("kniha", &czech());
        let old_id = store.add_entry(&original).unwrap();

        let mut replacement = entry("kniha", &czech());
        replacement.meanings.truncate(1);
        replacement.meanings[0].definition = "book".to_string();

        let new_id = store.replace_entry(&original.key(), &replacement).unwrap();
        assert_ne!(old_id, new_id);

        let loaded = store.get_entry(&EntryQuery::headword("kniha")).unwrap().unwrap();
        assert_eq!(loaded.meanings.len(), 1);
        assert_eq!(loaded.meanings[0].definition, "book");
    }

    #[test]
    fn test_replace_missing_entry_changes_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let missing = entry("kniha", &czech());

        let err = store.replace_entry(&missing.key(), &missing).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(count(&store, "entries"), 0);
    }

    #[test]
    fn test_search_filters_and_pages() {
        let store = SqliteStore::open_in_memory().unwrap();
        for word in ["kniha", "knihovna", "pes"] {
            store.add_entry(&entry(word, &czech())).unwrap();
        }
        store
            .add_entry(&entry("knihy", &LanguageSettings::new("Slovak", "English")))
            .unwrap();

        let query = SearchQuery {
            term: Some("knih".to_string()),
            target_language: Some("Czech".to_string()),
            ..SearchQuery::default()
        };
        let found = store.search_entries(&query).unwrap();
        let words: Vec<&str> = found.iter().map(|e| e.headword.as_str()).collect();
        // newest first
        assert_eq!(words, vec!["knihovna", "kniha"]);

        let query = SearchQuery {
            limit: 2,
            offset: 1,
            ..SearchQuery::default()
        };
        assert_eq!(store.search_entries(&query).unwrap().len(), 2);
    }

    #[test]
    fn test_lemma_cache_is_case_insensitive_and_upserts() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.cache_lemma("Running", "run", "English").unwrap();

        assert_eq!(
            store.get_cached_lemma("running", "English").unwrap().as_deref(),
            Some("run")
        );
        assert_eq!(store.get_cached_lemma("running", "Czech").unwrap(), None);

        store.cache_lemma("RUNNING", "to run", "English").unwrap();
        assert_eq!(
            store.get_cached_lemma("Running", "English").unwrap().as_deref(),
            Some("to run")
        );
        assert_eq!(count(&store, "lemma_cache"), 1);

        assert_eq!(store.clear_lemma_cache().unwrap(), 1);
        assert_eq!(store.get_cached_lemma("running", "English").unwrap(), None);
    }

    #[test]
    fn test_all_languages() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.add_entry(&entry("pan", &czech())).unwrap();
        store
            .add_entry(&entry("pan", &LanguageSettings::new("Polish", "German")))
            .unwrap();

        let summary = store.all_languages().unwrap();
        assert_eq!(summary.target_languages, vec!["Czech", "Polish"]);
        assert_eq!(summary.definition_languages, vec!["English", "German"]);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dictionary.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.add_entry(&entry("kniha", &czech())).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert!(store.get_entry(&EntryQuery::headword("kniha")).unwrap().is_some());
    }

    #[test]
    fn test_store_survives_a_panic_while_locked() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.add_entry(&entry("kniha", &czech())).unwrap();

        let result = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let mut conn = store.lock();
                    let tx = conn.transaction().unwrap();
                    insert_entry(&tx, &entry("pes", &czech())).unwrap();
                    panic!("writer died mid-transaction");
                })
                .join()
        });
        assert!(result.is_err());
        assert!(store.conn.is_poisoned());

        assert!(store.get_entry(&EntryQuery::headword("pes")).unwrap().is_none());
        assert!(store.get_entry(&EntryQuery::headword("kniha")).unwrap().is_some());
        store.add_entry(&entry("pes", &czech())).unwrap();
        assert_eq!(count(&store, "entries"), 2);
    }
}
