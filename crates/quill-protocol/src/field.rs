//! Chapter identifiers and the closed set of patchable fields

use crate::error::ProtocolError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

static HYPHENATED_UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("uuid pattern is valid")
});

/// Text columns of a chapter that accept patches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchableField {
    /// Chapter body
    Content,
    /// Chapter title
    Title,
    /// Short synopsis
    Summary,
    /// Private notes
    AuthorNotes,
}

impl PatchableField {
    /// Every patchable field
    pub const ALL: [Self; 4] = [Self::Content, Self::Title, Self::Summary, Self::AuthorNotes];

    /// Fields the editor autosaves
    pub const AUTOSAVED: [Self; 3] = [Self::Content, Self::Title, Self::Summary];

    /// Column name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Title => "title",
            Self::Summary => "summary",
            Self::AuthorNotes => "author_notes",
        }
    }

    /// Whether the editor autosaves this field
    #[inline]
    #[must_use]
    pub fn is_autosaved(self) -> bool {
        Self::AUTOSAVED.contains(&self)
    }
}

impl fmt::Display for PatchableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchableField {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| ProtocolError::InvalidField(s.to_string()))
    }
}

/// Chapter identifier (UUID, always hyphenated on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChapterId(pub Uuid);

impl ChapterId {
    /// Generate new chapter ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChapterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ChapterId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !HYPHENATED_UUID.is_match(s) {
            return Err(ProtocolError::InvalidRecordId(s.to_string()));
        }
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ProtocolError::InvalidRecordId(s.to_string()))
    }
}

impl TryFrom<String> for ChapterId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChapterId> for String {
    fn from(id: ChapterId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_round_trip() {
        for field in PatchableField::ALL {
            assert_eq!(field.as_str().parse::<PatchableField>().unwrap(), field);
        }
        assert_eq!(
            serde_json::to_string(&PatchableField::AuthorNotes).unwrap(),
            "\"author_notes\""
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        for name in ["word_count", "Content", "", "id"] {
            assert!(matches!(
                name.parse::<PatchableField>(),
                Err(ProtocolError::InvalidField(_))
            ));
        }
    }

    #[test]
    fn author_notes_not_autosaved() {
        assert!(!PatchableField::AuthorNotes.is_autosaved());
        assert!(PatchableField::Content.is_autosaved());
    }

    #[test]
    fn chapter_id_accepts_hyphenated_any_case() {
        let id: ChapterId = "6F9619FF-8B86-D011-B42D-00C04FC964FF".parse().unwrap();
        assert_eq!(id.to_string(), "6f9619ff-8b86-d011-b42d-00c04fc964ff");
    }

    #[test]
    fn chapter_id_rejects_other_forms() {
        for bad in [
            "not-a-uuid",
            "6f9619ff8b86d011b42d00c04fc964ff",
            "{6f9619ff-8b86-d011-b42d-00c04fc964ff}",
            "urn:uuid:6f9619ff-8b86-d011-b42d-00c04fc964ff",
            "",
        ] {
            assert!(bad.parse::<ChapterId>().is_err(), "{bad}");
        }
    }

    #[test]
    fn chapter_id_serde_uses_string() {
        let id = ChapterId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: ChapterId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<ChapterId>("\"nope\"").is_err());
    }
}
