use deepdict_store::StoreError;

use crate::synth::{RegenerateError, SynthesisError};

/// Failure of a queued job, as reported to the error callback
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Regenerate(#[from] RegenerateError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("job panicked: {0}")]
    Panicked(String),
}

impl JobError {
    /// True when a regeneration deleted the original and could not replace it
    pub fn entry_lost(&self) -> bool {
        match self {
            JobError::Regenerate(e) => e.entry_lost(),
            _ => false,
        }
    }
}
