//! Error taxonomy shared over the wire

use serde::{Deserialize, Serialize};

/// Validation failures for values arriving at the wire boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Field is not in the patchable allow-list
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// Record id is not a hyphenated UUID
    #[error("invalid record id: {0}")]
    InvalidRecordId(String),
}

impl ProtocolError {
    /// Wire code for this error
    #[inline]
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidField(_) => ErrorCode::InvalidField,
            Self::InvalidRecordId(_) => ErrorCode::InvalidRecordId,
        }
    }
}

/// Machine-readable failure code in RPC responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Field outside the allow-list
    InvalidField,
    /// Malformed record identifier
    InvalidRecordId,
    /// No record with that id
    NotFound,
    /// Patch text could not be decoded
    MalformedPatch,
    /// At least one hunk did not match the stored text
    PatchConflict,
    /// Storage rejected the write
    PersistenceError,
    /// Anything else
    UnexpectedError,
}

impl ErrorCode {
    /// Whether resubmitting the same request may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::PatchConflict | Self::PersistenceError | Self::UnexpectedError
        )
    }

    /// Caller sent something the server will never accept
    #[inline]
    #[must_use]
    pub fn is_validation(self) -> bool {
        matches!(
            self,
            Self::InvalidField | Self::InvalidRecordId | Self::NotFound | Self::MalformedPatch
        )
    }

    /// Server text diverged from the patch base
    #[inline]
    #[must_use]
    pub fn is_conflict(self) -> bool {
        self == Self::PatchConflict
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::InvalidField => "InvalidField",
            Self::InvalidRecordId => "InvalidRecordId",
            Self::NotFound => "NotFound",
            Self::MalformedPatch => "MalformedPatch",
            Self::PatchConflict => "PatchConflict",
            Self::PersistenceError => "PersistenceError",
            Self::UnexpectedError => "UnexpectedError",
        };
        f.write_str(name)
    }
}
