//! Terminal upload failures.

use crate::retry::ChunkError;

/// Category of a terminal failure, for callers that only branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Final response arrived but carried no resource id.
    FatalResponse,
    /// Non-retriable error from the chunk sender.
    FatalOther,
    /// Retriable errors kept coming past the retry cap.
    RetriesExhausted,
    /// Cancel token was set.
    Cancelled,
}

/// Why an upload stopped without a resource id.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("the upload failed with an unexpected response: {0}")]
    UnexpectedResponse(serde_json::Value),
    #[error("upload failed: {0}")]
    Fatal(ChunkError),
    #[error("no longer attempting to retry after {retries} retries; last error: {last_error}")]
    RetriesExhausted { retries: u32, last_error: ChunkError },
    #[error("upload cancelled")]
    Cancelled,
}

impl UploadError {
    pub fn kind(&self) -> FailureKind {
        match self {
            UploadError::UnexpectedResponse(_) => FailureKind::FatalResponse,
            UploadError::Fatal(_) => FailureKind::FatalOther,
            UploadError::RetriesExhausted { .. } => FailureKind::RetriesExhausted,
            UploadError::Cancelled => FailureKind::Cancelled,
        }
    }
}

/// Rejected session input; raised before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("invalid privacy status {0:?}; expected one of public, private, unlisted")]
    InvalidPrivacy(String),
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("file {0} does not exist or is not a regular file")]
    MissingFile(String),
}
