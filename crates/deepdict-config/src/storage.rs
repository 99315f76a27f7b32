use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_database_path() -> PathBuf {
    PathBuf::from("dictionary.db")
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Directory with prompt template overrides (`lemma_prompt.txt`, ...)
    #[serde(default)]
    pub prompts_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub(crate) fn apply_env(&mut self, var: &dyn Fn(&str) -> Option<String>) {
        if let Some(path) = var("DEEPDICT_DB_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(dir) = var("DEEPDICT_PROMPTS_DIR") {
            self.prompts_dir = Some(PathBuf::from(dir));
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            prompts_dir: None,
        }
    }
}
