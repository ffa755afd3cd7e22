//! Observable save state of a field

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Save lifecycle of one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    /// Nothing in flight
    #[default]
    Idle,
    /// A submission (or its retries) is in flight
    Saving,
    /// Last cycle was confirmed by the server
    Saved,
    /// Last cycle failed for good
    Error,
}

/// Snapshot of a field's autosave state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldState {
    /// Lifecycle status
    pub status: SaveStatus,
    /// Retries consumed by the current cycle
    pub retry_count: u32,
    /// Last confirmed save
    pub last_saved: Option<DateTime<Utc>>,
    /// Message of the last fatal failure
    pub error: Option<String>,
    /// Current value differs from the confirmed snapshot
    pub has_unsaved_changes: bool,
}

impl FieldState {
    /// Whether a save is in flight
    #[inline]
    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.status == SaveStatus::Saving
    }

    /// Whether the last cycle failed
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == SaveStatus::Error
    }
}
