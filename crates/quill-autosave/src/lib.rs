//! Quill Autosave - patch-based autosave for chapter fields
//!
//! The client side of the autosave pipeline:
//! - Debounces edits per field and turns them into patches
//! - Submits patches with bounded exponential backoff
//! - Rebases on conflicts by re-reading the server text
//! - Combines field states for a single save indicator
//! - Flushes derived metadata once when the editor closes
//!
//! # Example
//!
//! ```rust,ignore
//! use quill_autosave::{AutosaveConfig, ChapterAutosave, ChapterDraft, HttpTransport, NoopListener};
//! use quill_protocol::{ChapterId, PatchableField};
//! use std::{sync::Arc, time::Duration};
//!
//! # async fn example(id: ChapterId, draft: ChapterDraft) -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(HttpTransport::new("http://127.0.0.1:3000", Duration::from_secs(10))?);
//! let autosave = ChapterAutosave::spawn(id, &draft, transport, &AutosaveConfig::default(), Arc::new(NoopListener));
//! autosave.observe(PatchableField::Content, "It was a dark and stormy night")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod draft;
pub mod engine;
pub mod error;
pub mod flush;
pub mod indicator;
pub mod retry;
pub mod state;
pub mod transport;

pub use config::{AutosaveConfig, ConflictPolicy};
pub use coordinator::{combine, ChapterAutosave, OverallState};
pub use draft::ChapterDraft;
pub use engine::{FieldAutosave, NoopListener, SaveListener};
pub use error::{AutosaveError, SaveError};
pub use flush::{Beacon, FlushOutcome, HttpBeacon, MetadataFlush};
pub use indicator::{IndicatorView, SaveIndicator};
pub use retry::RetryPolicy;
pub use state::{FieldState, SaveStatus};
pub use transport::{HttpTransport, PatchTransport};
