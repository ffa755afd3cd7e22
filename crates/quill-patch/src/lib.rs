//! Quill Patch - text diff/patch codec
//!
//! Computes compact patches between two versions of a text field, encodes
//! them as portable text, and applies them to a possibly drifted base.
//!
//! ```
//! use quill_patch::{apply_patch, compute_diff};
//!
//! let patch = compute_diff("Hello world", "Hello brave world");
//! let outcome = apply_patch(&patch, "Hello world");
//! assert_eq!(outcome.text, "Hello brave world");
//! assert!(outcome.is_complete());
//! ```

pub mod apply;
pub mod diff;
pub mod patch;

pub use apply::ApplyOutcome;
pub use diff::Edit;
pub use patch::{Hunk, Patch, PatchError};

use std::time::Duration;

/// Tunables for diffing and applying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOptions {
    /// Equal characters kept around each change
    pub context_margin: usize,
    /// How far from its expected offset a hunk may be found
    pub match_window: usize,
    /// Upper bound on diff computation; `None` searches exhaustively
    pub diff_timeout: Option<Duration>,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            context_margin: 32,
            match_window: 1000,
            diff_timeout: Some(Duration::from_secs(1)),
        }
    }
}

impl PatchOptions {
    /// Set context margin
    #[must_use]
    pub fn with_context_margin(mut self, margin: usize) -> Self {
        self.context_margin = margin;
        self
    }

    /// Set match window
    #[must_use]
    pub fn with_match_window(mut self, window: usize) -> Self {
        self.match_window = window;
        self
    }

    /// Set diff timeout
    #[must_use]
    pub fn with_diff_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.diff_timeout = timeout;
        self
    }
}

/// Diff, encode and apply with a fixed set of options
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchCodec {
    options: PatchOptions,
}

impl PatchCodec {
    /// Create codec
    #[must_use]
    pub fn new(options: PatchOptions) -> Self {
        Self { options }
    }

    /// Options in use
    #[inline]
    #[must_use]
    pub fn options(&self) -> &PatchOptions {
        &self.options
    }

    /// Patch turning `old` into `new`; empty when they are equal
    #[must_use]
    pub fn compute_diff(&self, old: &str, new: &str) -> Patch {
        if old == new {
            return Patch::empty();
        }
        let edits = diff::edit_script(old, new, self.options.diff_timeout);
        Patch::from_edits(&edits, self.options.context_margin)
    }

    /// Decode patch text
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::Malformed`] when the text is not a valid encoding.
    pub fn parse_patch(&self, text: &str) -> Result<Patch, PatchError> {
        text.parse()
    }

    /// Apply `patch` to `base`
    #[must_use]
    pub fn apply_patch(&self, patch: &Patch, base: &str) -> ApplyOutcome {
        apply::apply(patch, base, self.options.match_window)
    }
}

/// [`PatchCodec::compute_diff`] with default options
#[must_use]
pub fn compute_diff(old: &str, new: &str) -> Patch {
    PatchCodec::default().compute_diff(old, new)
}

/// [`PatchCodec::parse_patch`] with default options
///
/// # Errors
///
/// Returns [`PatchError::Malformed`] when the text is not a valid encoding.
pub fn parse_patch(text: &str) -> Result<Patch, PatchError> {
    PatchCodec::default().parse_patch(text)
}

/// [`PatchCodec::apply_patch`] with default options
#[must_use]
pub fn apply_patch(patch: &Patch, base: &str) -> ApplyOutcome {
    PatchCodec::default().apply_patch(patch, base)
}
