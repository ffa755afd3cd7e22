//! Per-field autosave engine
//!
//! Each [`FieldAutosave`] owns an actor task that:
//! - Debounces edits fed through [`FieldAutosave::observe`]
//! - Diffs the confirmed snapshot against the latest value
//! - Submits the patch through a [`PatchTransport`], retrying with backoff
//! - Publishes [`FieldState`] on a watch channel
//!
//! The snapshot only advances when the server confirms a full application.
//! Dropping the handle aborts the actor; in-flight state is not persisted.

use crate::config::{AutosaveConfig, ConflictPolicy};
use crate::error::{AutosaveError, SaveError};
use crate::retry::RetryPolicy;
use crate::state::{FieldState, SaveStatus};
use crate::transport::PatchTransport;
use chrono::Utc;
use parking_lot::RwLock;
use quill_patch::PatchCodec;
use quill_protocol::{ChapterId, PatchApplied, PatchRequest, PatchableField};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Callbacks fired when a save cycle resolves
pub trait SaveListener: Send + Sync {
    /// Server confirmed the patch
    fn on_saved(&self, _field: PatchableField, _applied: &PatchApplied) {}

    /// Cycle failed for good (fires once per failed cycle)
    fn on_error(&self, _field: PatchableField, _error: &SaveError) {}
}

/// Listener that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl SaveListener for NoopListener {}

/// Handle to one field's autosave actor
#[derive(Debug)]
pub struct FieldAutosave {
    field: PatchableField,
    value_tx: watch::Sender<String>,
    state_rx: watch::Receiver<FieldState>,
    snapshot: Arc<RwLock<String>>,
    task: JoinHandle<()>,
}

impl FieldAutosave {
    /// Start autosaving `field`, with `initial` as the confirmed server text
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn spawn(
        chapter_id: ChapterId,
        field: PatchableField,
        initial: impl Into<String>,
        transport: Arc<dyn PatchTransport>,
        config: &AutosaveConfig,
        listener: Arc<dyn SaveListener>,
    ) -> Self {
        let initial = initial.into();
        let (value_tx, value_rx) = watch::channel(initial.clone());
        let (state_tx, state_rx) = watch::channel(FieldState::default());
        let snapshot = Arc::new(RwLock::new(initial));

        let actor = Actor {
            chapter_id,
            field,
            transport,
            listener,
            codec: PatchCodec::default(),
            policy: config.retry_policy(),
            debounce: config.debounce(),
            on_conflict: config.on_conflict,
            value_rx,
            state_tx,
            snapshot: Arc::clone(&snapshot),
            last_patch: None,
        };
        let task = tokio::spawn(actor.run());

        Self {
            field,
            value_tx,
            state_rx,
            snapshot,
            task,
        }
    }

    /// Field this engine saves
    #[inline]
    #[must_use]
    pub fn field(&self) -> PatchableField {
        self.field
    }

    /// Record the latest editor value; a change restarts the debounce timer
    ///
    /// # Errors
    ///
    /// Returns [`AutosaveError::Stopped`] if the actor is gone.
    pub fn observe(&self, value: impl Into<String>) -> Result<(), AutosaveError> {
        if self.task.is_finished() {
            return Err(AutosaveError::Stopped(self.field));
        }
        let value = value.into();
        self.value_tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
        Ok(())
    }

    /// Current state, with a fresh unsaved-changes flag
    #[must_use]
    pub fn state(&self) -> FieldState {
        let mut state = self.state_rx.borrow().clone();
        state.has_unsaved_changes = self.has_unsaved_changes();
        state
    }

    /// Watch state transitions
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FieldState> {
        self.state_rx.clone()
    }

    /// Last server-confirmed text
    #[must_use]
    pub fn snapshot(&self) -> String {
        self.snapshot.read().clone()
    }

    /// Latest observed value
    #[must_use]
    pub fn current_value(&self) -> String {
        self.value_tx.borrow().clone()
    }

    /// Latest value differs from the confirmed snapshot
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        *self.value_tx.borrow() != *self.snapshot.read()
    }
}

impl Drop for FieldAutosave {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Actor {
    chapter_id: ChapterId,
    field: PatchableField,
    transport: Arc<dyn PatchTransport>,
    listener: Arc<dyn SaveListener>,
    codec: PatchCodec,
    policy: RetryPolicy,
    debounce: Duration,
    on_conflict: ConflictPolicy,
    value_rx: watch::Receiver<String>,
    state_tx: watch::Sender<FieldState>,
    snapshot: Arc<RwLock<String>>,
    /// Text of the last patch handed to the transport, kept after failures
    last_patch: Option<String>,
}

impl Actor {
    async fn run(mut self) {
        loop {
            if self.value_rx.changed().await.is_err() {
                return;
            }
            self.refresh_unsaved();
            if !self.is_dirty() {
                continue;
            }

            loop {
                let quiet = tokio::time::sleep(self.debounce);
                tokio::select! {
                    changed = self.value_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                    () = quiet => break,
                }
                self.refresh_unsaved();
            }

            self.save_cycle().await;
        }
    }

    fn is_dirty(&self) -> bool {
        *self.value_rx.borrow() != *self.snapshot.read()
    }

    fn refresh_unsaved(&self) {
        let dirty = self.is_dirty();
        self.state_tx.send_if_modified(|state| {
            if state.has_unsaved_changes == dirty {
                false
            } else {
                state.has_unsaved_changes = dirty;
                true
            }
        });
    }

    /// Diff and validate; `None` when there is nothing worth submitting
    fn prepare(&self, base: &str, pending: &str) -> Option<String> {
        let patch = self.codec.compute_diff(base, pending);
        if patch.is_empty() {
            debug!(chapter = %self.chapter_id, field = %self.field, "no changes to save");
            return None;
        }

        let text = patch.to_text();
        if self.last_patch.as_deref() == Some(text.as_str()) {
            debug!(chapter = %self.chapter_id, field = %self.field, "patch already submitted");
            return None;
        }

        if let Err(err) = self.codec.parse_patch(&text) {
            warn!(
                chapter = %self.chapter_id,
                field = %self.field,
                error = %err,
                "generated patch failed validation, skipping"
            );
            return None;
        }

        Some(text)
    }

    async fn save_cycle(&mut self) {
        let pending = self.value_rx.borrow_and_update().clone();
        let base = self.snapshot.read().clone();
        let Some(mut patch_text) = self.prepare(&base, &pending) else {
            return;
        };

        self.last_patch = Some(patch_text.clone());
        self.state_tx.send_modify(|state| {
            state.status = SaveStatus::Saving;
            state.retry_count = 0;
            state.error = None;
        });

        let mut retry_count = 0;
        loop {
            let request = PatchRequest::new(self.chapter_id, self.field, patch_text.clone());
            let err = match self.transport.submit(&request).await {
                Ok(applied) => {
                    self.confirm(&pending, &applied);
                    return;
                }
                Err(err) => err,
            };

            if !self.policy.should_retry(retry_count, &err) {
                self.fail(&err, retry_count);
                return;
            }

            let delay = self.policy.backoff(retry_count);
            retry_count += 1;
            warn!(
                chapter = %self.chapter_id,
                field = %self.field,
                error = %err,
                retry = retry_count,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "save failed, retrying"
            );
            self.state_tx.send_modify(|state| state.retry_count = retry_count);
            tokio::time::sleep(delay).await;

            if err.is_conflict() && self.on_conflict == ConflictPolicy::Rebase {
                match self.rebase(&pending).await {
                    Ok(Some(text)) => patch_text = text,
                    Ok(None) => {
                        let applied = PatchApplied {
                            field: self.field,
                            new_length: pending.chars().count(),
                        };
                        self.confirm(&pending, &applied);
                        return;
                    }
                    Err(fetch_err) => {
                        warn!(
                            chapter = %self.chapter_id,
                            field = %self.field,
                            error = %fetch_err,
                            "rebase fetch failed, resubmitting original patch"
                        );
                    }
                }
            }
        }
    }

    /// Patch from the server's current text to `pending`; `None` if they match
    async fn rebase(&self, pending: &str) -> Result<Option<String>, SaveError> {
        let server_text = self.transport.fetch_field(self.chapter_id, self.field).await?;
        let patch = self.codec.compute_diff(&server_text, pending);
        if patch.is_empty() {
            return Ok(None);
        }
        let text = patch.to_text();
        self.codec.parse_patch(&text)?;
        debug!(chapter = %self.chapter_id, field = %self.field, "rebased patch onto server text");
        Ok(Some(text))
    }

    fn confirm(&mut self, pending: &str, applied: &PatchApplied) {
        *self.snapshot.write() = pending.to_string();
        let dirty = self.is_dirty();
        self.state_tx.send_modify(|state| {
            state.status = SaveStatus::Saved;
            state.retry_count = 0;
            state.error = None;
            state.last_saved = Some(Utc::now());
            state.has_unsaved_changes = dirty;
        });
        info!(
            chapter = %self.chapter_id,
            field = %self.field,
            new_length = applied.new_length,
            "field saved"
        );
        self.listener.on_saved(self.field, applied);
    }

    fn fail(&self, err: &SaveError, retry_count: u32) {
        self.state_tx.send_modify(|state| {
            state.status = SaveStatus::Error;
            state.error = Some(err.to_string());
        });
        error!(
            chapter = %self.chapter_id,
            field = %self.field,
            error = %err,
            retries = retry_count,
            "save failed"
        );
        self.listener.on_error(self.field, err);
    }
}
