//! Error types for the patch server
//!
//! - Patch endpoint failures (one variant per wire [`ErrorCode`])
//! - Chapter store failures
//! - Metadata endpoint failures with their HTTP status
//! - Configuration loading

use quill_patch::PatchError;
use quill_protocol::{ChapterId, ErrorCode, ProtocolError};
use std::path::PathBuf;
use warp::http::StatusCode;

/// Failure of a patch endpoint call
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// Field outside the allow-list
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// Record id is not a hyphenated UUID
    #[error("Invalid record id: {0}")]
    InvalidRecordId(String),

    /// No such chapter
    #[error("Chapter not found: {0}")]
    NotFound(ChapterId),

    /// Patch text did not decode
    #[error("Malformed patch: {0}")]
    MalformedPatch(#[from] PatchError),

    /// Some hunks did not match the stored text
    #[error("Patch did not apply cleanly (failed hunks: {failed_hunks:?})")]
    PatchConflict {
        /// Indices of hunks that did not match
        failed_hunks: Vec<usize>,
    },

    /// Store failed to read or write
    #[error("Failed to persist chapter: {0}")]
    Persistence(#[from] StoreError),

    /// Anything else
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl EndpointError {
    /// Wire code for this error
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidField(_) => ErrorCode::InvalidField,
            Self::InvalidRecordId(_) => ErrorCode::InvalidRecordId,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::MalformedPatch(_) => ErrorCode::MalformedPatch,
            Self::PatchConflict { .. } => ErrorCode::PatchConflict,
            Self::Persistence(_) => ErrorCode::PersistenceError,
            Self::Unexpected(_) => ErrorCode::UnexpectedError,
        }
    }

    /// Check if the client may retry
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

impl From<ProtocolError> for EndpointError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidField(field) => Self::InvalidField(field),
            ProtocolError::InvalidRecordId(id) => Self::InvalidRecordId(id),
        }
    }
}

/// Chapter store failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Stored document is not a chapter
    #[error("corrupt chapter document {path}: {source}")]
    Corrupt {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Backend refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Metadata endpoint failures
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// Body is not JSON
    #[error("Invalid request body")]
    InvalidBody(#[source] serde_json::Error),

    /// `chapterId` missing or not a string
    #[error("Chapter ID is required")]
    MissingChapterId,

    /// `chapterId` is not a hyphenated UUID
    #[error("Invalid chapter ID format")]
    InvalidChapterId,

    /// `wordCount` missing, negative or not a number
    #[error("Invalid word count")]
    InvalidWordCount,

    /// `readingTime` missing, negative or not a number
    #[error("Invalid reading time")]
    InvalidReadingTime,

    /// No such chapter
    #[error("Chapter not found")]
    NotFound,

    /// Store failed
    #[error("Failed to update chapter metadata")]
    Store(#[from] StoreError),
}

impl MetadataError {
    /// HTTP status for this failure
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody(_)
            | Self::MissingChapterId
            | Self::InvalidChapterId
            | Self::InvalidWordCount
            | Self::InvalidReadingTime => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Configuration loading failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config {path}: {source}")]
    Read {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for the config schema
    #[error("invalid config {path}: {source}")]
    Parse {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// Bind address did not parse
    #[error("invalid bind address {0:?}")]
    InvalidBind(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_codes() {
        assert_eq!(
            EndpointError::from(ProtocolError::InvalidField("x".into())).code(),
            ErrorCode::InvalidField
        );
        assert_eq!(
            EndpointError::PatchConflict { failed_hunks: vec![0] }.code(),
            ErrorCode::PatchConflict
        );
        assert!(EndpointError::Persistence(StoreError::Unavailable("down".into())).is_retryable());
        assert!(!EndpointError::NotFound(ChapterId::new()).is_retryable());
    }

    #[test]
    fn metadata_statuses_and_messages() {
        assert_eq!(MetadataError::InvalidWordCount.status(), StatusCode::BAD_REQUEST);
        assert_eq!(MetadataError::NotFound.status(), StatusCode::NOT_FOUND);
        let store = MetadataError::from(StoreError::Unavailable("down".into()));
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.to_string(), "Failed to update chapter metadata");
        assert_eq!(MetadataError::InvalidChapterId.to_string(), "Invalid chapter ID format");
    }
}
