use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use deepdict_config::Config;
use deepdict_config::queue::QueueConfig;
use deepdict_core::{
    DictionaryService, JobId, JobOutput, JobRequest, JobStatus, RequestQueue, UiHandoff,
};
use deepdict_llm::{LanguageModel, OpenAiCompatibleClient};
use deepdict_store::{EntryStore, SqliteStore};

use crate::events::{self, library, lookup, regenerate};
use crate::state::{Console, Task};
use crate::status::status_line;

/// Owns the service and the request queue; lives on the UI thread
pub struct AppController {
    service: Arc<DictionaryService>,
    queue: RequestQueue<Console>,
    handoff: UiHandoff<Console>,
    dirty: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl AppController {
    /// Build the model client, open the database and start the worker
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        if !config.llm.has_api_key() {
            tracing::warn!("DEEPSEEK_API_KEY is not set, lookups will fail");
        }
        let timeout = match config.llm.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let model: Arc<dyn LanguageModel> = Arc::new(
            OpenAiCompatibleClient::new(
                config.llm.api_key.clone(),
                config.llm.api_url.clone(),
                config.llm.model.clone(),
                timeout,
            )
            .context("Failed to build the model client")?,
        );
        let metadata = model.metadata();
        tracing::info!(provider = %metadata.name, model = %metadata.model, "Model client ready");

        let store = open_store(&config.storage.database_path)?;
        let service = Arc::new(DictionaryService::new(model, store, config));
        Self::with_service(service, &config.queue)
    }

    pub fn with_service(
        service: Arc<DictionaryService>,
        queue_config: &QueueConfig,
    ) -> anyhow::Result<Self> {
        let (queue, handoff) = RequestQueue::start(service.clone(), queue_config)
            .context("Failed to start the worker thread")?;

        let dirty = Arc::new(AtomicBool::new(false));
        let flag = dirty.clone();
        queue.set_ui_callback(move || flag.store(true, Ordering::Release));

        Ok(Self {
            service,
            queue,
            handoff,
            dirty,
            poll_interval: queue_config.poll_interval(),
        })
    }

    pub fn store(&self) -> Arc<dyn EntryStore> {
        self.service.store().clone()
    }

    /// Hand every queued task to the worker
    pub fn submit(&self, console: &mut Console) -> usize {
        let tasks = console.take_tasks();
        let mut submitted = 0;
        for task in tasks {
            let id = self.submit_task(task);
            // a stopped queue records the job as cancelled and never calls back
            if self.queue.request_status(id) == Some(JobStatus::Cancelled) {
                console.say("Request dropped: the queue is shut down");
                continue;
            }
            console.outstanding += 1;
            submitted += 1;
        }
        submitted
    }

    fn submit_task(&self, task: Task) -> JobId {
        match task {
            Task::ResolveLemma {
                word,
                languages,
                context,
            } => {
                let request = JobRequest::Lemma {
                    word: word.clone(),
                    languages: languages.clone(),
                    sentence_context: context.clone(),
                };
                self.queue.add_request(
                    request,
                    move |console: &mut Console, output| {
                        console.job_finished();
                        if let JobOutput::Lemma(lemma) = output {
                            lookup::lemma_resolved(console, word, languages, context, lemma);
                        }
                    },
                    events::job_failed,
                )
            }
            Task::CreateEntry {
                headword,
                languages,
                context,
            } => {
                let request = JobRequest::CreateEntry {
                    headword,
                    languages,
                    sentence_context: context,
                };
                self.queue
                    .add_request(request, entry_delivered, events::job_failed)
            }
            Task::Regenerate { key } => {
                let request = JobRequest::Regenerate {
                    key,
                    variation_seed: regenerate::variation_seed(),
                };
                self.queue
                    .add_request(request, entry_delivered, events::job_failed)
            }
            Task::ValidateLanguage { name, apply_to } => {
                self.queue.add_request(
                    JobRequest::ValidateLanguage { name },
                    move |console: &mut Console, output| {
                        console.job_finished();
                        if let JobOutput::Language(language) = output {
                            library::language_validated(console, apply_to, language);
                        }
                    },
                    events::job_failed,
                )
            }
        }
    }

    /// Wait one poll interval for results, run their callbacks, then submit
    /// whatever the callbacks queued
    pub fn pump(&self, console: &mut Console) -> usize {
        let delivered = self.handoff.wait_and_drain(console, self.poll_interval);
        self.submit(console);
        delivered
    }

    /// Pump until every submitted job and its follow-ups have reported back
    pub fn run_until_idle(&self, console: &mut Console, mut print: impl FnMut(&str)) {
        self.submit(console);
        loop {
            for line in console.take_lines() {
                print(&line);
            }
            if console.is_idle() {
                return;
            }
            self.pump(console);
        }
    }

    /// Drop every pending job. The running one still reports back.
    pub fn cancel_all(&self, console: &mut Console) -> usize {
        let cancelled = self.queue.cancel_all_requests();
        console.outstanding = console.outstanding.saturating_sub(cancelled);
        cancelled
    }

    /// True once per batch of queue changes
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    pub fn status(&self) -> String {
        status_line(&self.queue.stats(), self.queue.active_job())
    }

    pub fn queue(&self) -> &RequestQueue<Console> {
        &self.queue
    }

    pub fn shutdown(&self) {
        self.queue.shutdown();
    }
}

fn entry_delivered(console: &mut Console, output: JobOutput) {
    console.job_finished();
    if let JobOutput::Entry(entry) = output {
        lookup::entry_ready(console, entry);
    }
}

fn open_store(path: &Path) -> anyhow::Result<Arc<dyn EntryStore>> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
    }
    let store = SqliteStore::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    tracing::info!("Dictionary database at {}", path.display());
    Ok(Arc::new(store))
}
