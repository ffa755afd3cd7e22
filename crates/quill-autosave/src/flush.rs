//! Unload-time metadata flush
//!
//! When the editor closes, one snapshot of derived metadata is handed to a
//! [`Beacon`]. Delivery is best-effort, at-most-once and unacknowledged.

use crate::draft::ChapterDraft;
use quill_protocol::{ChapterId, MetadataPayload};
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Fire-and-forget delivery channel
pub trait Beacon: Send + Sync {
    /// Queue `body` for delivery to `url`; `true` if the beacon accepted it
    ///
    /// Acceptance says nothing about delivery.
    fn send(&self, url: &str, body: String) -> bool;
}

/// Beacon that spawns a detached POST on the current tokio runtime
#[derive(Debug, Clone, Default)]
pub struct HttpBeacon {
    client: reqwest::Client,
}

impl HttpBeacon {
    /// Create beacon
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Beacon for HttpBeacon {
    fn send(&self, url: &str, body: String) -> bool {
        let Ok(handle) = Handle::try_current() else {
            warn!("no runtime available for metadata beacon");
            return false;
        };
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(body);
        let url = url.to_string();
        handle.spawn(async move {
            if let Err(err) = request.send().await {
                debug!(%url, error = %err, "metadata beacon not delivered");
            }
        });
        true
    }
}

/// What [`MetadataFlush::on_unload`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// No changes since load
    NothingToFlush,
    /// Beacon accepted the payload
    Sent,
    /// Beacon refused; changes stay pending
    Rejected,
}

/// Tracks whether a chapter changed since load and flushes its metadata
pub struct MetadataFlush {
    chapter_id: ChapterId,
    url: String,
    loaded: ChapterDraft,
    changed: bool,
    beacon: Arc<dyn Beacon>,
}

impl std::fmt::Debug for MetadataFlush {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataFlush")
            .field("chapter_id", &self.chapter_id)
            .field("url", &self.url)
            .field("changed", &self.changed)
            .finish_non_exhaustive()
    }
}

impl MetadataFlush {
    /// Start tracking `loaded`; the payload goes to `url`
    #[must_use]
    pub fn new(
        chapter_id: ChapterId,
        url: impl Into<String>,
        loaded: ChapterDraft,
        beacon: Arc<dyn Beacon>,
    ) -> Self {
        Self {
            chapter_id,
            url: url.into(),
            loaded,
            changed: false,
            beacon,
        }
    }

    /// Note the current draft; any difference from the loaded text marks
    /// the chapter as changed
    pub fn track(&mut self, draft: &ChapterDraft) {
        if *draft != self.loaded {
            self.changed = true;
        }
    }

    /// Changes are waiting for a flush
    #[inline]
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        self.changed
    }

    /// Send one metadata snapshot if anything changed
    pub fn on_unload(&mut self, draft: &ChapterDraft) -> FlushOutcome {
        self.track(draft);
        if !self.changed {
            return FlushOutcome::NothingToFlush;
        }

        let payload = MetadataPayload::derive(
            self.chapter_id,
            &draft.content,
            &draft.title,
            &draft.summary,
            &draft.author_notes,
        );
        let body = match serde_json::to_string(&payload) {
            Ok(body) => body,
            Err(err) => {
                warn!(chapter = %self.chapter_id, error = %err, "could not encode metadata");
                return FlushOutcome::Rejected;
            }
        };

        if self.beacon.send(&self.url, body) {
            self.changed = false;
            FlushOutcome::Sent
        } else {
            warn!(chapter = %self.chapter_id, "metadata beacon refused payload");
            FlushOutcome::Rejected
        }
    }
}
