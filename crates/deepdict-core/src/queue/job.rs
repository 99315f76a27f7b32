use std::fmt;

use deepdict_types::{DictionaryEntry, EntryKey, LanguageSettings, SentenceContext, ValidatedLanguage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    Lemma,
    #[serde(rename = "entry-create")]
    CreateEntry,
    Regenerate,
    ValidateLanguage,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobKind::Lemma => "lemma",
            JobKind::CreateEntry => "entry-create",
            JobKind::Regenerate => "regenerate",
            JobKind::ValidateLanguage => "validate-language",
        })
    }
}

/// Parameters of a job, fixed when it is enqueued
#[derive(Debug, Clone, PartialEq)]
pub enum JobRequest {
    Lemma {
        word: String,
        languages: LanguageSettings,
        sentence_context: Option<String>,
    },
    CreateEntry {
        headword: String,
        languages: LanguageSettings,
        sentence_context: Option<SentenceContext>,
    },
    Regenerate {
        key: EntryKey,
        variation_seed: u32,
    },
    ValidateLanguage {
        name: String,
    },
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::Lemma { .. } => JobKind::Lemma,
            JobRequest::CreateEntry { .. } => JobKind::CreateEntry,
            JobRequest::Regenerate { .. } => JobKind::Regenerate,
            JobRequest::ValidateLanguage { .. } => JobKind::ValidateLanguage,
        }
    }

    /// The word or name the job is about, for logs
    pub fn subject(&self) -> &str {
        match self {
            JobRequest::Lemma { word, .. } => word,
            JobRequest::CreateEntry { headword, .. } => headword,
            JobRequest::Regenerate { key, .. } => &key.headword,
            JobRequest::ValidateLanguage { name } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutput {
    Lemma(String),
    Entry(DictionaryEntry),
    Language(ValidatedLanguage),
}

/// What the error callback receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub job_id: JobId,
    pub kind: JobKind,
    pub message: String,
    /// A regeneration deleted the stored entry and could not replace it
    pub entry_lost: bool,
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Active,
    Completed,
    Failed,
    Cancelled,
}

/// A finished job kept for status queries
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub error: Option<String>,
    pub finished_at: chrono::DateTime<chrono::Local>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        let names: Vec<String> = [
            JobKind::Lemma,
            JobKind::CreateEntry,
            JobKind::Regenerate,
            JobKind::ValidateLanguage,
        ]
        .iter()
        .map(|k| k.to_string())
        .collect();
        assert_eq!(names, ["lemma", "entry-create", "regenerate", "validate-language"]);

        assert_eq!(
            serde_json::to_value(JobKind::CreateEntry).unwrap(),
            serde_json::json!("entry-create")
        );
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_request_kind_and_subject() {
        let request = JobRequest::CreateEntry {
            headword: "ahoj".to_string(),
            languages: LanguageSettings::default(),
            sentence_context: None,
        };
        assert_eq!(request.kind(), JobKind::CreateEntry);
        assert_eq!(request.subject(), "ahoj");
    }
}
