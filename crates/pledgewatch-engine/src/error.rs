use pledgewatch_core::{ConfigError, InvalidSubmission, LifecycleError, SubmissionStatus};
use pledgewatch_store::StoreError;
use thiserror::Error;

/// Errors surfaced synchronously to callers of the query API.
///
/// Extraction problems never appear here: they are reported per record in
/// the ingest summary.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{name:?} matches promises at several companies ({companies}); pass a company")]
    AmbiguousMatch { name: String, companies: String },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    InvalidSubmission(#[from] InvalidSubmission),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("submission {id} cannot move from {from} to {to}")]
    StatusTransition {
        id: String,
        from: SubmissionStatus,
        to: SubmissionStatus,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
