//! Multi-field autosave for one chapter
//!
//! Runs one [`FieldAutosave`] per autosaved field. Fields never lock each
//! other; a failure in one does not touch the others.

use crate::config::AutosaveConfig;
use crate::draft::ChapterDraft;
use crate::engine::{FieldAutosave, SaveListener};
use crate::error::AutosaveError;
use crate::state::{FieldState, SaveStatus};
use crate::transport::PatchTransport;
use chrono::{DateTime, Utc};
use quill_protocol::{ChapterId, PatchableField};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Combined state across fields
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OverallState {
    /// Combined status
    pub status: SaveStatus,
    /// Most recent confirmed save of any field
    pub last_saved: Option<DateTime<Utc>>,
    /// Any field has unsaved changes
    pub has_unsaved_changes: bool,
    /// First error message, in field order
    pub error: Option<String>,
}

/// Combine field states: error beats saving, saving beats unsaved-idle,
/// and everything else is saved
#[must_use]
pub fn combine<'a>(states: impl IntoIterator<Item = &'a FieldState>) -> OverallState {
    let mut any_error = false;
    let mut any_saving = false;
    let mut overall = OverallState::default();

    for state in states {
        any_error |= state.is_error();
        any_saving |= state.is_saving();
        overall.has_unsaved_changes |= state.has_unsaved_changes;
        overall.last_saved = overall.last_saved.max(state.last_saved);
        if overall.error.is_none() && state.is_error() {
            overall.error.clone_from(&state.error);
        }
    }

    overall.status = if any_error {
        SaveStatus::Error
    } else if any_saving {
        SaveStatus::Saving
    } else if overall.has_unsaved_changes {
        SaveStatus::Idle
    } else {
        SaveStatus::Saved
    };
    overall
}

/// Autosave of every autosaved field of a chapter
#[derive(Debug)]
pub struct ChapterAutosave {
    chapter_id: ChapterId,
    engines: BTreeMap<PatchableField, FieldAutosave>,
}

impl ChapterAutosave {
    /// Start one engine per autosaved field, seeded from `draft`
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn spawn(
        chapter_id: ChapterId,
        draft: &ChapterDraft,
        transport: Arc<dyn PatchTransport>,
        config: &AutosaveConfig,
        listener: Arc<dyn SaveListener>,
    ) -> Self {
        let engines = PatchableField::AUTOSAVED
            .into_iter()
            .map(|field| {
                let engine = FieldAutosave::spawn(
                    chapter_id,
                    field,
                    draft.get(field),
                    Arc::clone(&transport),
                    config,
                    Arc::clone(&listener),
                );
                (field, engine)
            })
            .collect();

        Self {
            chapter_id,
            engines,
        }
    }

    /// Chapter being saved
    #[inline]
    #[must_use]
    pub fn chapter_id(&self) -> ChapterId {
        self.chapter_id
    }

    /// Engine of an autosaved field
    ///
    /// # Errors
    ///
    /// Returns [`AutosaveError::NotAutosaved`] for fields without an engine.
    pub fn engine(&self, field: PatchableField) -> Result<&FieldAutosave, AutosaveError> {
        self.engines
            .get(&field)
            .ok_or(AutosaveError::NotAutosaved(field))
    }

    /// Route an edit to the field's engine
    ///
    /// # Errors
    ///
    /// Returns [`AutosaveError::NotAutosaved`] for `author_notes`, or
    /// [`AutosaveError::Stopped`] if the engine is gone.
    pub fn observe(&self, field: PatchableField, value: impl Into<String>) -> Result<(), AutosaveError> {
        self.engine(field)?.observe(value)
    }

    /// Feed every autosaved field from a draft
    ///
    /// # Errors
    ///
    /// Returns [`AutosaveError::Stopped`] if an engine is gone.
    pub fn observe_draft(&self, draft: &ChapterDraft) -> Result<(), AutosaveError> {
        for (field, engine) in &self.engines {
            engine.observe(draft.get(*field))?;
        }
        Ok(())
    }

    /// State of one field
    ///
    /// # Errors
    ///
    /// Returns [`AutosaveError::NotAutosaved`] for fields without an engine.
    pub fn field_state(&self, field: PatchableField) -> Result<FieldState, AutosaveError> {
        Ok(self.engine(field)?.state())
    }

    /// Combined state of all fields
    #[must_use]
    pub fn overall(&self) -> OverallState {
        let states: Vec<FieldState> = self.engines.values().map(FieldAutosave::state).collect();
        combine(&states)
    }
}
