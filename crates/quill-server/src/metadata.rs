//! Unload-time metadata endpoint logic

use crate::error::MetadataError;
use crate::locks::ChapterLocks;
use crate::store::ChapterStore;
use chrono::Utc;
use quill_protocol::{ChapterId, MetadataAck, PatchableField};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Applies metadata snapshots sent by closing editors
#[derive(Clone)]
pub struct MetadataService {
    store: Arc<dyn ChapterStore>,
    locks: Arc<ChapterLocks>,
}

impl std::fmt::Debug for MetadataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataService").finish_non_exhaustive()
    }
}

/// Validated metadata update
#[derive(Debug, Clone, PartialEq)]
struct MetadataUpdate {
    chapter_id: ChapterId,
    word_count: u64,
    reading_time: u64,
    title: String,
    summary: Option<String>,
    author_notes: Option<String>,
}

impl MetadataService {
    /// Create service
    #[must_use]
    pub fn new(store: Arc<dyn ChapterStore>) -> Self {
        Self {
            store,
            locks: Arc::new(ChapterLocks::new()),
        }
    }

    /// Share a lock table with other chapter writers
    #[must_use]
    pub fn with_locks(mut self, locks: Arc<ChapterLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Handle a raw request body (any content type, JSON expected)
    ///
    /// A body that is not JSON at all answers 400 with "Invalid request
    /// body", the same as any other client mistake, rather than 500. Only
    /// storage failures produce 500.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`]; its [`status`](MetadataError::status) is the
    /// HTTP status to answer with.
    pub async fn save(&self, body: &[u8]) -> Result<MetadataAck, MetadataError> {
        let started = Instant::now();
        let raw: Value = serde_json::from_slice(body).map_err(MetadataError::InvalidBody)?;
        let update = match validate(&raw) {
            Ok(update) => update,
            Err(err) => {
                warn!(error = %err, "rejected metadata request");
                return Err(err);
            }
        };

        let _guard = self.locks.lock(update.chapter_id).await;
        let mut record = self
            .store
            .get(update.chapter_id)
            .await?
            .ok_or(MetadataError::NotFound)?;

        let now = Utc::now();
        record.word_count = update.word_count;
        record.reading_time_minutes = update.reading_time;
        record.set_text(PatchableField::Title, update.title);
        record.summary = update.summary.map_or(Value::Null, Value::String);
        record.author_notes = update.author_notes.map_or(Value::Null, Value::String);
        record.last_edited_at = Some(now);
        self.store.put(record).await?;

        let duration = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(chapter = %update.chapter_id, duration_ms = duration, "metadata saved");
        Ok(MetadataAck {
            success: true,
            message: "Metadata saved successfully".to_string(),
            timestamp: now,
            duration,
        })
    }
}

fn validate(raw: &Value) -> Result<MetadataUpdate, MetadataError> {
    let chapter_id = match raw.get("chapterId").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id,
        _ => return Err(MetadataError::MissingChapterId),
    };
    let chapter_id: ChapterId = chapter_id
        .parse()
        .map_err(|_| MetadataError::InvalidChapterId)?;
    let word_count = non_negative(raw.get("wordCount")).ok_or(MetadataError::InvalidWordCount)?;
    let reading_time =
        non_negative(raw.get("readingTime")).ok_or(MetadataError::InvalidReadingTime)?;

    Ok(MetadataUpdate {
        chapter_id,
        word_count,
        reading_time,
        title: trimmed(raw.get("title")).unwrap_or_default(),
        summary: trimmed(raw.get("summary")),
        author_notes: trimmed(raw.get("authorNotes")),
    })
}

/// Non-negative JSON number, rounded to a whole count
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn non_negative(value: Option<&Value>) -> Option<u64> {
    let value = value?;
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n.round() as u64)
    })
}

/// Trimmed string, `None` when missing, blank or not a string
fn trimmed(value: Option<&Value>) -> Option<String> {
    let text = value?.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ChapterRecord, MemoryStore};
    use serde_json::json;

    #[test]
    fn validation_messages_follow_field_order() {
        let id = ChapterId::new().to_string();
        let cases = [
            (json!({}), "Chapter ID is required"),
            (json!({ "chapterId": 7 }), "Chapter ID is required"),
            (json!({ "chapterId": "abc" }), "Invalid chapter ID format"),
            (json!({ "chapterId": id, "wordCount": "12" }), "Invalid word count"),
            (json!({ "chapterId": id, "wordCount": -1 }), "Invalid word count"),
            (json!({ "chapterId": id, "wordCount": 1 }), "Invalid reading time"),
        ];
        for (body, message) in cases {
            assert_eq!(validate(&body).unwrap_err().to_string(), message, "{body}");
        }
    }

    #[test]
    fn blank_texts_become_none() {
        let id = ChapterId::new();
        let update = validate(&json!({
            "chapterId": id.to_string(),
            "wordCount": 10,
            "readingTime": 1.0,
            "title": "  Draft  ",
            "summary": "   ",
            "authorNotes": null,
        }))
        .unwrap();
        assert_eq!(update.title, "Draft");
        assert_eq!(update.summary, None);
        assert_eq!(update.author_notes, None);
        assert_eq!(update.reading_time, 1);
    }

    #[tokio::test]
    async fn save_updates_record() {
        let id = ChapterId::new();
        let store = Arc::new(MemoryStore::with_records([ChapterRecord::new(id, "Old")]));
        let svc = MetadataService::new(store.clone());
        let body = json!({
            "chapterId": id.to_string(),
            "wordCount": 420,
            "readingTime": 3,
            "title": " New ",
            "summary": "Short",
            "authorNotes": "",
        });

        let ack = svc.save(body.to_string().as_bytes()).await.unwrap();
        assert!(ack.success);
        assert_eq!(ack.message, "Metadata saved successfully");

        let record = store.get(id).await.unwrap().unwrap();
        assert_eq!(record.word_count, 420);
        assert_eq!(record.reading_time_minutes, 3);
        assert_eq!(record.title, json!("New"));
        assert_eq!(record.summary, json!("Short"));
        assert_eq!(record.author_notes, Value::Null);
        assert_eq!(record.last_edited_at, Some(ack.timestamp));
    }

    #[tokio::test]
    async fn unknown_chapter_and_bad_json() {
        let svc = MetadataService::new(Arc::new(MemoryStore::new()));
        let body = json!({ "chapterId": ChapterId::new().to_string(), "wordCount": 0, "readingTime": 0 });
        assert!(matches!(
            svc.save(body.to_string().as_bytes()).await,
            Err(MetadataError::NotFound)
        ));
        assert!(matches!(svc.save(b"{oops").await, Err(MetadataError::InvalidBody(_))));
    }
}
