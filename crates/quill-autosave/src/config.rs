//! Autosave configuration

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do when the server reports `PatchConflict`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Fetch the server text and diff the pending value against it
    #[default]
    Rebase,
    /// Resubmit the same patch like any transient failure
    Retry,
}

/// Per-field autosave tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before saving
    pub debounce_ms: u64,
    /// Retries after the initial submission
    pub max_retries: u32,
    /// First backoff delay; doubles on every retry
    pub backoff_base_ms: u64,
    /// Conflict handling
    pub on_conflict: ConflictPolicy,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1500,
            max_retries: 3,
            backoff_base_ms: 1000,
            on_conflict: ConflictPolicy::Rebase,
        }
    }
}

impl AutosaveConfig {
    /// Create default config
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set debounce delay
    #[must_use]
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set retry bound
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set first backoff delay
    #[must_use]
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set conflict policy
    #[must_use]
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.on_conflict = policy;
        self
    }

    /// Debounce delay
    #[inline]
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Retry policy derived from this config
    #[inline]
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.backoff_base_ms))
    }
}
