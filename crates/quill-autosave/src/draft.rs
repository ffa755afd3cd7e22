//! Editor-side text of a chapter

use quill_protocol::PatchableField;
use serde::{Deserialize, Serialize};

/// Current text of every patchable field
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChapterDraft {
    /// Chapter body
    pub content: String,
    /// Title
    pub title: String,
    /// Synopsis
    pub summary: String,
    /// Private notes
    pub author_notes: String,
}

impl ChapterDraft {
    /// Text of `field`
    #[must_use]
    pub fn get(&self, field: PatchableField) -> &str {
        match field {
            PatchableField::Content => &self.content,
            PatchableField::Title => &self.title,
            PatchableField::Summary => &self.summary,
            PatchableField::AuthorNotes => &self.author_notes,
        }
    }

    /// Replace the text of `field`
    pub fn set(&mut self, field: PatchableField, value: impl Into<String>) {
        let slot = match field {
            PatchableField::Content => &mut self.content,
            PatchableField::Title => &mut self.title,
            PatchableField::Summary => &mut self.summary,
            PatchableField::AuthorNotes => &mut self.author_notes,
        };
        *slot = value.into();
    }

    /// Builder form of [`set`](Self::set)
    #[must_use]
    pub fn with(mut self, field: PatchableField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_and_set_cover_every_field() {
        let mut draft = ChapterDraft::default();
        for field in PatchableField::ALL {
            draft.set(field, field.as_str());
        }
        for field in PatchableField::ALL {
            assert_eq!(draft.get(field), field.as_str());
        }
    }
}
