//! Quill Protocol - wire types for chapter autosave
//!
//! Shared by the autosave client and the patch server:
//! - Chapter ids and the patchable field allow-list
//! - Patch RPC request/response envelopes
//! - Error codes and their retry classification
//! - Unload-time metadata payload

pub mod envelope;
pub mod error;
pub mod field;
pub mod metadata;

pub use envelope::{ApiResponse, FieldValue, PatchApplied, PatchRequest, RemoteFailure};
pub use error::{ErrorCode, ProtocolError};
pub use field::{ChapterId, PatchableField};
pub use metadata::{reading_time, word_count, MetadataAck, MetadataPayload};

/// Route of the patch RPC
pub const PATCH_ROUTE: &str = "/api/chapters/patch";

/// Route of the unload metadata endpoint
pub const METADATA_ROUTE: &str = "/api/chapters/metadata";
