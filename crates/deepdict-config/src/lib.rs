use serde::{Deserialize, Serialize};

use self::anki::AnkiConfig;
use self::languages::LanguageConfig;
use self::llm::LlmConfig;
use self::queue::QueueConfig;
use self::storage::StorageConfig;

pub mod anki;
pub mod languages;
pub mod llm;
pub mod profile;
pub mod queue;
pub mod storage;

pub use anki::EmptyFieldAction;
pub use profile::{Profile, ProfileStore, RecentLookup};
pub use queue::RegenerateStrategy;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub languages: LanguageConfig,
    pub anki: AnkiConfig,
    pub queue: QueueConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Overlay environment variables on top of the loaded values.
    /// Runs on every start so the environment always wins over the profile.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    pub fn apply_env_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        self.llm.apply_env(&var);
        self.queue.apply_env(&var);
        self.storage.apply_env(&var);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),
}
