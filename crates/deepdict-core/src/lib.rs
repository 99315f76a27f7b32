pub mod error;
pub mod language;
pub mod lemma;
pub mod preprocess;
pub mod prompt;
pub mod queue;
pub mod response;
pub mod service;
pub mod synth;

pub use error::JobError;
pub use language::LanguageValidator;
pub use lemma::LemmaResolver;
pub use queue::{
    JobExecutor, JobFailure, JobId, JobKind, JobOutput, JobRequest, JobStatus, QueueStats,
    RequestQueue, UiHandoff,
};
pub use service::DictionaryService;
pub use synth::{EntrySynthesizer, LossCause, RegenerateError, SynthesisError};

#[cfg(test)]
mod tests;
