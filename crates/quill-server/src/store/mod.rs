//! Chapter persistence
//!
//! Text columns are kept as loose JSON values so rows holding `null` or
//! structured data still load; readers coerce anything that is not a
//! string to `""`.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quill_protocol::{ChapterId, PatchableField};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Persisted chapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterRecord {
    /// Chapter id
    pub id: ChapterId,
    /// Title column
    #[serde(default)]
    pub title: Value,
    /// Body column
    #[serde(default)]
    pub content: Value,
    /// Synopsis column
    #[serde(default)]
    pub summary: Value,
    /// Private notes column
    #[serde(default)]
    pub author_notes: Value,
    /// Words in the content, as last reported by the editor
    #[serde(default)]
    pub word_count: u64,
    /// Reading time estimate in minutes
    #[serde(default)]
    pub reading_time_minutes: u64,
    /// Last metadata flush
    #[serde(default)]
    pub last_edited_at: Option<DateTime<Utc>>,
}

impl ChapterRecord {
    /// Empty chapter with a title
    #[must_use]
    pub fn new(id: ChapterId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: Value::String(title.into()),
            content: Value::String(String::new()),
            summary: Value::Null,
            author_notes: Value::Null,
            word_count: 0,
            reading_time_minutes: 0,
            last_edited_at: None,
        }
    }

    /// Builder form of [`set_text`](Self::set_text)
    #[must_use]
    pub fn with_text(mut self, field: PatchableField, text: impl Into<String>) -> Self {
        self.set_text(field, text);
        self
    }

    /// Raw column value
    #[must_use]
    pub fn column(&self, field: PatchableField) -> &Value {
        match field {
            PatchableField::Content => &self.content,
            PatchableField::Title => &self.title,
            PatchableField::Summary => &self.summary,
            PatchableField::AuthorNotes => &self.author_notes,
        }
    }

    fn column_mut(&mut self, field: PatchableField) -> &mut Value {
        match field {
            PatchableField::Content => &mut self.content,
            PatchableField::Title => &mut self.title,
            PatchableField::Summary => &mut self.summary,
            PatchableField::AuthorNotes => &mut self.author_notes,
        }
    }

    /// Column text; `""` for null, numbers, objects and other non-strings
    #[must_use]
    pub fn text_of(&self, field: PatchableField) -> String {
        match self.column(field) {
            Value::String(text) => text.clone(),
            _ => String::new(),
        }
    }

    /// Overwrite a column with text
    pub fn set_text(&mut self, field: PatchableField, text: impl Into<String>) {
        *self.column_mut(field) = Value::String(text.into());
    }
}

/// Chapter storage backend
#[async_trait]
pub trait ChapterStore: Send + Sync {
    /// Load a chapter
    async fn get(&self, id: ChapterId) -> Result<Option<ChapterRecord>, StoreError>;

    /// Insert or replace a chapter
    async fn put(&self, record: ChapterRecord) -> Result<(), StoreError>;
}
