use serde::{Deserialize, Serialize};

fn default_api_url() -> String {
    "https://api.deepseek.com".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_entry_temperature() -> f32 {
    0.7
}

/// Language model endpoint settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// Bearer token for the completion API. Read from the environment only,
    /// never written back to a profile.
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-request timeout, 0 disables it
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Sampling temperature used for entry generation
    #[serde(default = "default_entry_temperature")]
    pub entry_temperature: f32,
}

impl LlmConfig {
    pub(crate) fn apply_env(&mut self, var: &dyn Fn(&str) -> Option<String>) {
        if let Some(api_key) = var("DEEPSEEK_API_KEY") {
            self.api_key = api_key;
        }
        if let Some(api_url) = var("DEEPDICT_API_URL") {
            self.api_url = api_url;
        }
        if let Some(model) = var("DEEPDICT_MODEL") {
            self.model = model;
        }
        if let Some(secs) = var("DEEPDICT_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.request_timeout_secs = secs;
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: default_api_url(),
            model: default_model(),
            request_timeout_secs: default_timeout_secs(),
            entry_temperature: default_entry_temperature(),
        }
    }
}
