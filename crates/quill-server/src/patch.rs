//! Patch endpoint logic
//!
//! Validates a field patch, applies it to the stored text and persists the
//! result. A patch with any unmatched hunk is rejected as a whole, so the
//! stored text is never partially patched. Writes take the chapter's lock
//! from a [`ChapterLocks`] table shared with the metadata endpoint.

use crate::error::EndpointError;
use crate::locks::ChapterLocks;
use crate::store::ChapterStore;
use quill_patch::PatchCodec;
use quill_protocol::{ChapterId, FieldValue, PatchApplied, PatchableField};
use std::sync::Arc;
use tracing::{info, warn};

/// Applies field patches against a [`ChapterStore`]
pub struct PatchService {
    store: Arc<dyn ChapterStore>,
    codec: PatchCodec,
    locks: Arc<ChapterLocks>,
}

impl std::fmt::Debug for PatchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchService")
            .field("codec", &self.codec)
            .field("locked_chapters", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl PatchService {
    /// Create service with default codec options
    #[must_use]
    pub fn new(store: Arc<dyn ChapterStore>) -> Self {
        Self::with_codec(store, PatchCodec::default())
    }

    /// Create service with a specific codec
    #[must_use]
    pub fn with_codec(store: Arc<dyn ChapterStore>, codec: PatchCodec) -> Self {
        Self {
            store,
            codec,
            locks: Arc::new(ChapterLocks::new()),
        }
    }

    /// Share a lock table with other chapter writers
    #[must_use]
    pub fn with_locks(mut self, locks: Arc<ChapterLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Lock table guarding chapter writes
    #[inline]
    #[must_use]
    pub fn locks(&self) -> &Arc<ChapterLocks> {
        &self.locks
    }

    /// Backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ChapterStore> {
        &self.store
    }

    /// Apply `patch_text` to one field of one chapter
    ///
    /// # Errors
    ///
    /// - `InvalidField` / `InvalidRecordId` before anything is read
    /// - `NotFound` if the chapter does not exist
    /// - `MalformedPatch` if the text does not decode
    /// - `PatchConflict` if any hunk fails to match (nothing is written)
    /// - `Persistence` if the store fails
    pub async fn apply_field_patch(
        &self,
        record_id: &str,
        field: &str,
        patch_text: &str,
    ) -> Result<PatchApplied, EndpointError> {
        let field: PatchableField = field.parse()?;
        let id: ChapterId = record_id.parse()?;

        let _guard = self.locks.lock(id).await;

        let mut record = self.store.get(id).await?.ok_or(EndpointError::NotFound(id))?;
        let current = record.text_of(field);

        let patch = self.codec.parse_patch(patch_text)?;
        let outcome = self.codec.apply_patch(&patch, &current);
        if !outcome.is_complete() {
            let failed_hunks = outcome.failed_hunks();
            warn!(chapter = %id, field = %field, ?failed_hunks, "patch conflict");
            return Err(EndpointError::PatchConflict { failed_hunks });
        }

        let new_length = outcome.text.chars().count();
        record.set_text(field, outcome.text);
        self.store.put(record).await?;

        info!(chapter = %id, field = %field, hunks = patch.len(), new_length, "patch applied");
        Ok(PatchApplied { field, new_length })
    }

    /// Current text of one field
    ///
    /// # Errors
    ///
    /// Same validation and lookup errors as [`apply_field_patch`](Self::apply_field_patch).
    pub async fn read_field(&self, record_id: &str, field: &str) -> Result<FieldValue, EndpointError> {
        let field: PatchableField = field.parse()?;
        let id: ChapterId = record_id.parse()?;
        let record = self.store.get(id).await?.ok_or(EndpointError::NotFound(id))?;
        Ok(FieldValue {
            field,
            value: record.text_of(field),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ChapterRecord, MemoryStore};
    use quill_patch::compute_diff;
    use serde_json::json;

    async fn service_with(record: ChapterRecord) -> PatchService {
        let store = Arc::new(MemoryStore::with_records([record]));
        PatchService::new(store)
    }

    #[tokio::test]
    async fn applies_simple_edit() {
        let id = ChapterId::new();
        let svc = service_with(
            ChapterRecord::new(id, "t").with_text(PatchableField::Content, "Hello world"),
        )
        .await;
        let patch = compute_diff("Hello world", "Hello brave world").to_text();

        let applied = svc
            .apply_field_patch(&id.to_string(), "content", &patch)
            .await
            .unwrap();
        assert_eq!(applied.new_length, 17);

        let stored = svc.read_field(&id.to_string(), "content").await.unwrap();
        assert_eq!(stored.value, "Hello brave world");
    }

    #[tokio::test]
    async fn structured_column_is_patched_from_empty() {
        let id = ChapterId::new();
        let mut record = ChapterRecord::new(id, "t");
        record.summary = json!({ "legacy": true });
        let svc = service_with(record).await;
        let patch = compute_diff("", "A summary").to_text();

        let applied = svc
            .apply_field_patch(&id.to_string(), "summary", &patch)
            .await
            .unwrap();
        assert_eq!(applied.new_length, 9);
    }

    #[tokio::test]
    async fn field_is_validated_before_record_id() {
        let svc = service_with(ChapterRecord::new(ChapterId::new(), "t")).await;
        let err = svc
            .apply_field_patch("not-a-uuid", "word_count", "")
            .await
            .unwrap_err();
        assert!(matches!(err, EndpointError::InvalidField(_)));
    }

    #[tokio::test]
    async fn malformed_patch_after_lookup() {
        let id = ChapterId::new();
        let svc = service_with(ChapterRecord::new(id, "t")).await;
        let err = svc
            .apply_field_patch(&id.to_string(), "title", "garbage")
            .await
            .unwrap_err();
        assert!(matches!(err, EndpointError::MalformedPatch(_)));

        let missing = ChapterId::new();
        let err = svc
            .apply_field_patch(&missing.to_string(), "title", "garbage")
            .await
            .unwrap_err();
        assert!(matches!(err, EndpointError::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_chapters_leave_no_locks_behind() {
        let svc = service_with(ChapterRecord::new(ChapterId::new(), "t")).await;
        for _ in 0..64 {
            let err = svc
                .apply_field_patch(&ChapterId::new().to_string(), "content", "")
                .await
                .unwrap_err();
            assert!(matches!(err, EndpointError::NotFound(_)));
        }
        assert!(svc.locks().is_empty());
    }
}
