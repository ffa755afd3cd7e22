use super::{ChapterRecord, ChapterStore};
use crate::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use quill_protocol::ChapterId;

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<ChapterId, ChapterRecord>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `records`
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = ChapterRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.records.insert(record.id, record);
        }
        store
    }

    /// Number of chapters
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Store holds no chapters
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ChapterStore for MemoryStore {
    async fn get(&self, id: ChapterId) -> Result<Option<ChapterRecord>, StoreError> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn put(&self, record: ChapterRecord) -> Result<(), StoreError> {
        self.records.insert(record.id, record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get() {
        let store = MemoryStore::new();
        let record = ChapterRecord::new(ChapterId::new(), "One");
        store.put(record.clone()).await.unwrap();
        assert_eq!(store.get(record.id).await.unwrap(), Some(record));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn missing_chapter_is_none() {
        let store = MemoryStore::new();
        assert!(store.get(ChapterId::new()).await.unwrap().is_none());
    }
}
