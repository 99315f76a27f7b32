use deepdict_core::{JobId, JobKind, QueueStats};

/// One-line queue summary for the prompt
pub fn status_line(stats: &QueueStats, active: Option<(JobId, JobKind)>) -> String {
    let running = match active {
        Some((_, kind)) => format!("running {kind}"),
        None => "idle".to_string(),
    };
    format!(
        "[queue] {running}, {} pending | {} done, {} failed, {} cancelled",
        stats.pending, stats.completed, stats.failed, stats.cancelled
    )
}
