//! Request and response bodies of the patch RPC

use crate::error::ErrorCode;
use crate::field::{ChapterId, PatchableField};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/chapters/patch`
///
/// `record_id` and `field` stay as raw strings so the server can report
/// `InvalidRecordId` and `InvalidField` instead of a generic decode error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchRequest {
    /// Chapter being edited
    pub record_id: String,
    /// Column name
    pub field: String,
    /// Encoded patch
    pub patch_text: String,
}

impl PatchRequest {
    /// Build a request for a typed id and field
    #[must_use]
    pub fn new(record_id: ChapterId, field: PatchableField, patch_text: impl Into<String>) -> Self {
        Self {
            record_id: record_id.to_string(),
            field: field.as_str().to_string(),
            patch_text: patch_text.into(),
        }
    }
}

/// Payload of a successful patch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchApplied {
    /// Patched column
    pub field: PatchableField,
    /// Length of the stored text in characters
    pub new_length: usize,
}

/// Current text of one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    /// Column name
    pub field: PatchableField,
    /// Stored text, coerced to `""` when not text
    pub value: String,
}

/// Uniform RPC envelope: `{ success, data }` or `{ success, error, code }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded
    pub success: bool,
    /// Result on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine-readable failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl<T> ApiResponse<T> {
    /// Successful response
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    /// Failed response
    #[must_use]
    pub fn failure(code: ErrorCode, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            code: Some(code),
        }
    }

    /// Unwrap into a `Result`
    ///
    /// # Errors
    ///
    /// Returns [`RemoteFailure`] when `success` is false or `data` is missing.
    pub fn into_result(self) -> Result<T, RemoteFailure> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(RemoteFailure {
                code: ErrorCode::UnexpectedError,
                message: "response carried no data".to_string(),
            }),
            (false, _) => Err(RemoteFailure {
                code: self.code.unwrap_or(ErrorCode::UnexpectedError),
                message: self.error.unwrap_or_else(|| "request failed".to_string()),
            }),
        }
    }
}

/// Decoded failure envelope
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct RemoteFailure {
    /// Failure code (defaults to `UnexpectedError` when absent)
    pub code: ErrorCode,
    /// Message from the server
    pub message: String,
}
