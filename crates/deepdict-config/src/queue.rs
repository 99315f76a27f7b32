use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_shutdown_timeout_ms() -> u64 {
    2000
}

fn default_history_limit() -> usize {
    100
}

/// How a regeneration replaces the stored entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegenerateStrategy {
    /// Delete the stored entry, then generate and save the replacement.
    /// A failure after the delete loses the original entry.
    #[default]
    DeleteFirst,
    /// Generate first and swap in one transaction; failures keep the original.
    ReplaceAfterCreate,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct QueueConfig {
    /// How often the UI thread drains finished jobs
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound on waiting for the worker thread at shutdown
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
    /// Finished jobs kept for status queries
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default)]
    pub regenerate_strategy: RegenerateStrategy,
}

impl QueueConfig {
    pub(crate) fn apply_env(&mut self, var: &dyn Fn(&str) -> Option<String>) {
        if let Some(ms) = var("DEEPDICT_POLL_MS").and_then(|v| v.parse().ok()) {
            self.poll_interval_ms = ms;
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            history_limit: default_history_limit(),
            regenerate_strategy: RegenerateStrategy::default(),
        }
    }
}
