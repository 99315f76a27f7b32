use std::any::Any;
use std::sync::Arc;
use std::thread::JoinHandle;

use kanal::Sender;

use crate::error::JobError;

use super::handoff::Delivery;
use super::{Job, JobExecutor, JobFailure, JobStatus, Shared};

pub(super) fn spawn<C: 'static>(
    shared: Arc<Shared<C>>,
    executor: Arc<dyn JobExecutor>,
    tx: Sender<Delivery<C>>,
) -> std::io::Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("deepdict-worker".to_string())
        .spawn(move || runtime.block_on(run(shared, executor, tx)))
}

async fn run<C: 'static>(
    shared: Arc<Shared<C>>,
    executor: Arc<dyn JobExecutor>,
    tx: Sender<Delivery<C>>,
) {
    tracing::info!("Worker started");

    while let Some(job) = next_job(&shared).await {
        shared.notify_ui();
        process(&shared, &executor, &tx, job).await;
        shared.notify_ui();
    }

    tracing::info!("Worker stopped");
}

/// Wait for a job; `None` once shutdown is signalled
async fn next_job<C>(shared: &Shared<C>) -> Option<Job<C>> {
    loop {
        {
            let mut state = shared.lock();
            if !state.accepting {
                return None;
            }
            // pop and mark active in one critical section
            if let Some(job) = state.pending.pop_front() {
                state.active = Some((job.id, job.request.kind()));
                return Some(job);
            }
        }

        tokio::select! {
            _ = shared.wake.notified() => {}
            _ = shared.shutdown.cancelled() => return None,
        }
    }
}

async fn process<C: 'static>(
    shared: &Shared<C>,
    executor: &Arc<dyn JobExecutor>,
    tx: &Sender<Delivery<C>>,
    job: Job<C>,
) {
    let Job {
        id,
        request,
        on_success,
        on_error,
    } = job;
    let kind = request.kind();
    tracing::info!(job_id = %id, kind = %kind, subject = %request.subject(), "Job started");

    // A panicking executor fails the job instead of the worker
    let task = {
        let executor = executor.clone();
        tokio::spawn(async move { executor.execute(request).await })
    };

    let result = match task.await {
        Ok(result) => result,
        Err(e) => Err(match e.try_into_panic() {
            Ok(payload) => JobError::Panicked(panic_message(payload.as_ref()).to_string()),
            Err(e) => JobError::Panicked(e.to_string()),
        }),
    };

    let (status, error, delivery): (JobStatus, Option<String>, Delivery<C>) = match result {
        Ok(output) => {
            tracing::info!(job_id = %id, kind = %kind, "Job completed");
            (
                JobStatus::Completed,
                None,
                Box::new(move |ctx: &mut C| on_success(ctx, output)),
            )
        }
        Err(e) => {
            let failure = JobFailure {
                job_id: id,
                kind,
                message: e.to_string(),
                entry_lost: e.entry_lost(),
            };
            tracing::error!(job_id = %id, kind = %kind, entry_lost = failure.entry_lost, "Job failed: {}", failure.message);
            (
                JobStatus::Failed,
                Some(failure.message.clone()),
                Box::new(move |ctx: &mut C| on_error(ctx, failure)),
            )
        }
    };

    if tx.send(delivery).is_err() {
        tracing::warn!(job_id = %id, "UI handoff closed, result dropped");
    }

    let mut state = shared.lock();
    state.record(id, kind, status, error);
    state.active = None;
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
