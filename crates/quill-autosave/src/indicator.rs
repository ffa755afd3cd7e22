//! What the save indicator shows
//!
//! `saved` hides after a short delay, `error` after a longer one, and
//! `idle` is only shown while there are unsaved changes.

use crate::coordinator::OverallState;
use crate::state::SaveStatus;
use std::time::Duration;
use tokio::time::Instant;

/// Visible indicator content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorView {
    /// Nothing shown
    Hidden,
    /// Unsaved edits waiting for the debounce
    Unsaved,
    /// Save in flight
    Saving,
    /// Recently saved
    Saved,
    /// Recent failure
    Error(String),
}

/// Time-based indicator state machine
#[derive(Debug, Clone)]
pub struct SaveIndicator {
    saved_for: Duration,
    error_for: Duration,
    state: OverallState,
    since: Instant,
}

impl SaveIndicator {
    /// Default time `saved` stays visible
    pub const SAVED_VISIBLE: Duration = Duration::from_secs(2);
    /// Default time `error` stays visible
    pub const ERROR_VISIBLE: Duration = Duration::from_secs(4);

    /// Create indicator
    #[must_use]
    pub fn new(now: Instant) -> Self {
        Self {
            saved_for: Self::SAVED_VISIBLE,
            error_for: Self::ERROR_VISIBLE,
            state: OverallState::default(),
            since: now,
        }
    }

    /// Set how long `saved` stays visible
    #[must_use]
    pub fn with_saved_duration(mut self, duration: Duration) -> Self {
        self.saved_for = duration;
        self
    }

    /// Set how long `error` stays visible
    #[must_use]
    pub fn with_error_duration(mut self, duration: Duration) -> Self {
        self.error_for = duration;
        self
    }

    /// Feed the latest combined state; a status change restarts the timer
    pub fn update(&mut self, state: &OverallState, now: Instant) {
        if state.status != self.state.status {
            self.since = now;
        }
        self.state = state.clone();
    }

    /// What to show at `now`
    #[must_use]
    pub fn view(&self, now: Instant) -> IndicatorView {
        let shown = now.saturating_duration_since(self.since);
        match self.state.status {
            SaveStatus::Saving => IndicatorView::Saving,
            SaveStatus::Saved if shown < self.saved_for => IndicatorView::Saved,
            SaveStatus::Error if shown < self.error_for => {
                IndicatorView::Error(self.state.error.clone().unwrap_or_default())
            }
            SaveStatus::Idle if self.state.has_unsaved_changes => IndicatorView::Unsaved,
            _ => IndicatorView::Hidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overall(status: SaveStatus, unsaved: bool) -> OverallState {
        OverallState {
            status,
            has_unsaved_changes: unsaved,
            ..OverallState::default()
        }
    }

    #[test]
    fn saved_hides_after_two_seconds() {
        let start = Instant::now();
        let mut indicator = SaveIndicator::new(start);
        indicator.update(&overall(SaveStatus::Saved, false), start);
        assert_eq!(indicator.view(start + Duration::from_millis(1999)), IndicatorView::Saved);
        assert_eq!(indicator.view(start + Duration::from_secs(2)), IndicatorView::Hidden);
    }

    #[test]
    fn error_hides_after_four_seconds() {
        let start = Instant::now();
        let mut indicator = SaveIndicator::new(start);
        let mut state = overall(SaveStatus::Error, true);
        state.error = Some("offline".into());
        indicator.update(&state, start);
        assert_eq!(
            indicator.view(start + Duration::from_secs(3)),
            IndicatorView::Error("offline".into())
        );
        assert_eq!(indicator.view(start + Duration::from_secs(4)), IndicatorView::Hidden);
    }

    #[test]
    fn idle_only_shown_with_unsaved_changes() {
        let start = Instant::now();
        let mut indicator = SaveIndicator::new(start);
        indicator.update(&overall(SaveStatus::Idle, false), start);
        assert_eq!(indicator.view(start), IndicatorView::Hidden);
        indicator.update(&overall(SaveStatus::Idle, true), start);
        assert_eq!(indicator.view(start), IndicatorView::Unsaved);
    }

    #[test]
    fn saving_never_hides() {
        let start = Instant::now();
        let mut indicator = SaveIndicator::new(start);
        indicator.update(&overall(SaveStatus::Saving, true), start);
        assert_eq!(indicator.view(start + Duration::from_secs(60)), IndicatorView::Saving);
    }

    #[test]
    fn same_status_keeps_timer() {
        let start = Instant::now();
        let mut indicator = SaveIndicator::new(start).with_saved_duration(Duration::from_secs(1));
        indicator.update(&overall(SaveStatus::Saved, false), start);
        indicator.update(&overall(SaveStatus::Saved, false), start + Duration::from_millis(900));
        assert_eq!(indicator.view(start + Duration::from_millis(1100)), IndicatorView::Hidden);
    }
}
