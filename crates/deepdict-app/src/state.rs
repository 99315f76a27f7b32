use std::collections::VecDeque;
use std::sync::Arc;

use deepdict_config::ProfileStore;
use deepdict_store::EntryStore;
use deepdict_types::{EntryKey, LanguageSettings, SentenceContext};

/// Which half of the language pair a validated name is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageSide {
    Target,
    Definition,
}

/// Work the UI thread wants the queue to run. Handlers push these and the
/// controller turns them into requests with the matching callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    ResolveLemma {
        word: String,
        languages: LanguageSettings,
        context: Option<String>,
    },
    CreateEntry {
        headword: String,
        languages: LanguageSettings,
        context: Option<SentenceContext>,
    },
    Regenerate {
        key: EntryKey,
    },
    ValidateLanguage {
        name: String,
        apply_to: Option<LanguageSide>,
    },
}

/// UI-thread context. Queue callbacks receive it when the handoff is drained.
pub struct Console {
    pub profile: ProfileStore,
    pub store: Arc<dyn EntryStore>,
    /// Jobs submitted whose callback has not run yet
    pub outstanding: usize,
    tasks: VecDeque<Task>,
    lines: Vec<String>,
}

impl Console {
    pub fn new(profile: ProfileStore, store: Arc<dyn EntryStore>) -> Self {
        Self {
            profile,
            store,
            outstanding: 0,
            tasks: VecDeque::new(),
            lines: Vec::new(),
        }
    }

    /// Current lookup languages, snapshotted for a new job
    pub fn languages(&self) -> LanguageSettings {
        self.profile.config().languages.settings()
    }

    pub fn push_task(&mut self, task: Task) {
        self.tasks.push_back(task);
    }

    pub fn take_tasks(&mut self) -> Vec<Task> {
        self.tasks.drain(..).collect()
    }

    pub fn say(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn take_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    pub fn job_finished(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
    }

    /// Nothing running and nothing left to submit
    pub fn is_idle(&self) -> bool {
        self.outstanding == 0 && self.tasks.is_empty()
    }
}
