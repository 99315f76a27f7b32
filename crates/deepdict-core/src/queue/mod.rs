//! Serial request queue between the UI thread and the model.
//!
//! The UI thread enqueues jobs together with their callbacks. One worker
//! thread runs them in FIFO order, at most one at a time, and hands each
//! outcome back through a [`UiHandoff`] that the UI thread drains on its own
//! schedule, so callbacks only ever run there.

mod handoff;
mod job;
mod worker;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use deepdict_config::queue::QueueConfig;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::JobError;

pub use handoff::{Delivery, UiHandoff};
pub use job::{
    JobFailure, JobId, JobKind, JobOutput, JobRecord, JobRequest, JobStatus, QueueStats,
};

pub type SuccessCallback<C> = Box<dyn FnOnce(&mut C, JobOutput) + Send>;
pub type ErrorCallback<C> = Box<dyn FnOnce(&mut C, JobFailure) + Send>;

/// Runs one job to completion on the worker thread
#[async_trait]
pub trait JobExecutor: Send + Sync + 'static {
    async fn execute(&self, request: JobRequest) -> Result<JobOutput, JobError>;
}

pub(crate) struct Job<C> {
    id: JobId,
    request: JobRequest,
    on_success: SuccessCallback<C>,
    on_error: ErrorCallback<C>,
}

pub(crate) struct QueueState<C> {
    pending: VecDeque<Job<C>>,
    active: Option<(JobId, JobKind)>,
    history: VecDeque<JobRecord>,
    history_limit: usize,
    accepting: bool,
    completed: usize,
    failed: usize,
    cancelled: usize,
}

impl<C> QueueState<C> {
    fn record(&mut self, id: JobId, kind: JobKind, status: JobStatus, error: Option<String>) {
        match status {
            JobStatus::Completed => self.completed += 1,
            JobStatus::Failed => self.failed += 1,
            JobStatus::Cancelled => self.cancelled += 1,
            JobStatus::Pending | JobStatus::Active => return,
        }

        self.history.push_back(JobRecord {
            id,
            kind,
            status,
            error,
            finished_at: chrono::Local::now(),
        });
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    fn cancel_pending(&mut self) -> Vec<Job<C>> {
        let drained: Vec<Job<C>> = self.pending.drain(..).collect();
        for job in &drained {
            self.record(job.id, job.request.kind(), JobStatus::Cancelled, None);
        }
        drained
    }
}

type UiCallback = Arc<dyn Fn() + Send + Sync>;

pub(crate) struct Shared<C> {
    state: Mutex<QueueState<C>>,
    wake: Notify,
    shutdown: CancellationToken,
    ui_callback: RwLock<Option<UiCallback>>,
}

impl<C> Shared<C> {
    fn lock(&self) -> MutexGuard<'_, QueueState<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called without the state lock held
    fn notify_ui(&self) {
        let callback = self
            .ui_callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Stop accepting work and cancel everything still pending
    fn close(&self) -> usize {
        let dropped = {
            let mut state = self.lock();
            state.accepting = false;
            state.cancel_pending()
        };
        self.shutdown.cancel();

        let count = dropped.len();
        drop(dropped);
        if count > 0 {
            tracing::info!("Cancelled {} pending jobs at shutdown", count);
            self.notify_ui();
        }
        count
    }
}

/// Handle used by the UI thread to submit and manage jobs.
///
/// `C` is the UI-thread context handed to callbacks when the
/// [`UiHandoff`] is drained.
pub struct RequestQueue<C: 'static> {
    shared: Arc<Shared<C>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    shutdown_timeout: Duration,
}

impl<C: 'static> RequestQueue<C> {
    /// Spawn the worker thread and return the queue with its UI handoff
    pub fn start(
        executor: Arc<dyn JobExecutor>,
        config: &QueueConfig,
    ) -> std::io::Result<(Self, UiHandoff<C>)> {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                active: None,
                history: VecDeque::new(),
                history_limit: config.history_limit,
                accepting: true,
                completed: 0,
                failed: 0,
                cancelled: 0,
            }),
            wake: Notify::new(),
            shutdown: CancellationToken::new(),
            ui_callback: RwLock::new(None),
        });

        let (tx, handoff) = handoff::channel();
        let worker = worker::spawn(shared.clone(), executor, tx)?;

        let queue = Self {
            shared,
            worker: Mutex::new(Some(worker)),
            shutdown_timeout: config.shutdown_timeout(),
        };
        Ok((queue, handoff))
    }

    /// Append a job. Returns at once; exactly one callback later runs on
    /// the UI thread unless the job is cancelled first.
    pub fn add_request<S, E>(&self, request: JobRequest, on_success: S, on_error: E) -> JobId
    where
        S: FnOnce(&mut C, JobOutput) + Send + 'static,
        E: FnOnce(&mut C, JobFailure) + Send + 'static,
    {
        let id = JobId::new();
        let kind = request.kind();

        {
            let mut state = self.shared.lock();
            if !state.accepting {
                state.record(id, kind, JobStatus::Cancelled, None);
                tracing::warn!(job_id = %id, kind = %kind, "Queue is shut down, job dropped");
                return id;
            }

            tracing::debug!(job_id = %id, kind = %kind, subject = %request.subject(), "Job queued");
            state.pending.push_back(Job {
                id,
                request,
                on_success: Box::new(on_success),
                on_error: Box::new(on_error),
            });
        }

        self.shared.wake.notify_one();
        self.shared.notify_ui();
        id
    }

    pub fn pending_count(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// 0 or 1
    pub fn active_count(&self) -> usize {
        usize::from(self.shared.lock().active.is_some())
    }

    /// Cancel every pending job. A job already running is left alone and
    /// its callback still fires.
    pub fn cancel_all_requests(&self) -> usize {
        let dropped = self.shared.lock().cancel_pending();
        let count = dropped.len();
        drop(dropped);

        if count > 0 {
            tracing::info!("Cancelled {} pending jobs", count);
            self.shared.notify_ui();
        }
        count
    }

    /// Cancel one pending job. False when it already started, finished or
    /// never existed.
    pub fn cancel_request(&self, id: JobId) -> bool {
        let removed = {
            let mut state = self.shared.lock();
            let Some(index) = state.pending.iter().position(|job| job.id == id) else {
                return false;
            };
            let job = state.pending.remove(index);
            if let Some(job) = &job {
                state.record(job.id, job.request.kind(), JobStatus::Cancelled, None);
            }
            job
        };

        drop(removed);
        tracing::info!(job_id = %id, "Cancelled pending job");
        self.shared.notify_ui();
        true
    }

    pub fn request_status(&self, id: JobId) -> Option<JobStatus> {
        let state = self.shared.lock();
        if state.active.is_some_and(|(active, _)| active == id) {
            return Some(JobStatus::Active);
        }
        if state.pending.iter().any(|job| job.id == id) {
            return Some(JobStatus::Pending);
        }
        state
            .history
            .iter()
            .rev()
            .find(|record| record.id == id)
            .map(|record| record.status)
    }

    pub fn active_job(&self) -> Option<(JobId, JobKind)> {
        self.shared.lock().active
    }

    /// Most recent finished jobs, newest last
    pub fn history(&self) -> Vec<JobRecord> {
        self.shared.lock().history.iter().cloned().collect()
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.shared.lock();
        QueueStats {
            pending: state.pending.len(),
            active: usize::from(state.active.is_some()),
            completed: state.completed,
            failed: state.failed,
            cancelled: state.cancelled,
        }
    }

    /// Called whenever the queue length or the active job changes, from the
    /// worker thread or the thread that cancelled. It should only schedule
    /// work for the UI thread.
    pub fn set_ui_callback(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self
            .shared
            .ui_callback
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    /// Stop the worker. The running job may finish; pending jobs are
    /// cancelled without callbacks. Waits at most the configured shutdown
    /// timeout. Safe to call more than once.
    pub fn shutdown(&self) {
        let Some(worker) = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };

        self.shared.close();

        let deadline = Instant::now() + self.shutdown_timeout;
        while !worker.is_finished() {
            if Instant::now() >= deadline {
                tracing::warn!(
                    "Worker still busy after {:?}, detaching it",
                    self.shutdown_timeout
                );
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        if worker.join().is_err() {
            tracing::error!("Worker thread panicked");
        } else {
            tracing::info!("Request queue stopped");
        }
    }
}

impl<C: 'static> Drop for RequestQueue<C> {
    fn drop(&mut self) {
        self.shared.close();
    }
}
