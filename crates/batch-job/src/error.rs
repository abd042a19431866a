//! Structured, pattern-matchable errors for the batch job core.
//!
//! Store adapters and job hooks are free to fail for arbitrary reasons; this
//! module draws the line between the failure modes a caller is expected to
//! branch on (this enum) and everything else, which is carried as an opaque
//! cause via [`anyhow::Error`] / [`std::error::Error`] boxing.

use thiserror::Error;

/// Errors surfaced by the batch job core's own operations.
///
/// Row/blob store implementations are external; their failures are wrapped
/// in [`BatchJobError::Store`] rather than modeled per-backend here.
#[derive(Debug, Error)]
pub enum BatchJobError {
    #[error("row or blob store operation failed: {0}")]
    Store(#[source] anyhow::Error),

    #[error("invalid crontab expression {expression:?}: {reason}")]
    InvalidCrontab { expression: String, reason: String },

    #[error("malformed job id {job_id:?}: expected 4 underscore-separated segments, found {found}")]
    MalformedJobId { job_id: String, found: usize },

    #[error("no settings registered for job name {0:?}")]
    UnknownJobName(String),

    #[error("no constructor registered for job class {0:?}")]
    UnknownJobClass(String),

    #[error("failed to serialize job state: {0}")]
    Serialization(#[source] serde_json::Error),
}

impl From<serde_json::Error> for BatchJobError {
    fn from(err: serde_json::Error) -> Self {
        BatchJobError::Serialization(err)
    }
}

pub type BatchJobResult<T> = Result<T, BatchJobError>;
