//! Error types for the autosave client
//!
//! - Save failures reported by a transport (retry classification lives here)
//! - Misuse of the multi-field coordinator

use quill_patch::PatchError;
use quill_protocol::{ErrorCode, PatchableField, RemoteFailure};

/// Failure of one patch submission
#[derive(Debug, Clone, thiserror::Error)]
pub enum SaveError {
    /// Request never produced a server verdict
    #[error("transport error: {0}")]
    Transport(String),

    /// Server answered with a failure envelope
    #[error("server rejected patch ({code}): {message}")]
    Rejected {
        /// Failure code
        code: ErrorCode,
        /// Server message
        message: String,
    },

    /// Locally produced patch text did not decode
    #[error("patch encoding error: {0}")]
    Encode(#[from] PatchError),
}

impl SaveError {
    /// Create rejection error
    #[inline]
    pub fn rejected(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Rejected {
            code,
            message: message.into(),
        }
    }

    /// Check if resubmitting may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Rejected { code, .. } => code.is_retryable(),
            Self::Encode(_) => false,
        }
    }

    /// Check if the server text diverged from the patch base
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Rejected { code, .. } if code.is_conflict())
    }

    /// Server code, if the server produced one
    #[inline]
    #[must_use]
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<RemoteFailure> for SaveError {
    fn from(failure: RemoteFailure) -> Self {
        Self::Rejected {
            code: failure.code,
            message: failure.message,
        }
    }
}

impl From<reqwest::Error> for SaveError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Coordinator misuse
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AutosaveError {
    /// Field exists but the editor does not autosave it
    #[error("field {0} is not autosaved")]
    NotAutosaved(PatchableField),

    /// Field actor is no longer running
    #[error("autosave for field {0} has stopped")]
    Stopped(PatchableField),
}
