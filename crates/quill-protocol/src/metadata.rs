//! Derived chapter metadata sent when the editor closes

use crate::field::ChapterId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Words per minute used for the reading-time estimate
pub const WORDS_PER_MINUTE: u64 = 200;

/// Count whitespace-separated words
#[must_use]
pub fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// Minutes to read `words` words, rounded up
#[inline]
#[must_use]
pub fn reading_time(words: u64) -> u64 {
    words.div_ceil(WORDS_PER_MINUTE)
}

/// Body of `POST /api/chapters/metadata`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPayload {
    /// Chapter the metadata belongs to
    pub chapter_id: ChapterId,
    /// Words in the content
    pub word_count: u64,
    /// Estimated minutes to read
    pub reading_time: u64,
    /// Trimmed title
    pub title: String,
    /// Trimmed summary, `None` when blank
    pub summary: Option<String>,
    /// Trimmed notes, `None` when blank
    pub author_notes: Option<String>,
}

impl MetadataPayload {
    /// Derive metadata from the current draft text
    #[must_use]
    pub fn derive(
        chapter_id: ChapterId,
        content: &str,
        title: &str,
        summary: &str,
        author_notes: &str,
    ) -> Self {
        let words = word_count(content);
        Self {
            chapter_id,
            word_count: words,
            reading_time: reading_time(words),
            title: title.trim().to_string(),
            summary: non_blank(summary),
            author_notes: non_blank(author_notes),
        }
    }
}

/// Reply of the metadata endpoint on success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataAck {
    /// Always `true`
    pub success: bool,
    /// Confirmation text
    pub message: String,
    /// Value written to `last_edited_at`
    pub timestamp: DateTime<Utc>,
    /// Handling time in milliseconds
    pub duration: u64,
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_words_across_whitespace() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("   \n\t "), 0);
        assert_eq!(word_count("  one two\nthree\tfour  "), 4);
    }

    #[test]
    fn reading_time_rounds_up() {
        assert_eq!(reading_time(0), 0);
        assert_eq!(reading_time(1), 1);
        assert_eq!(reading_time(200), 1);
        assert_eq!(reading_time(201), 2);
    }

    #[test]
    fn derive_trims_and_nulls_blank_fields() {
        let id = ChapterId::new();
        let payload = MetadataPayload::derive(id, "a b c", "  Title  ", "   ", " notes ");
        assert_eq!(payload.word_count, 3);
        assert_eq!(payload.reading_time, 1);
        assert_eq!(payload.title, "Title");
        assert_eq!(payload.summary, None);
        assert_eq!(payload.author_notes.as_deref(), Some("notes"));

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "chapterId": id.to_string(),
                "wordCount": 3,
                "readingTime": 1,
                "title": "Title",
                "summary": null,
                "authorNotes": "notes",
            })
        );
    }
}
