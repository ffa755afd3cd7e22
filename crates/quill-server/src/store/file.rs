use super::{ChapterRecord, ChapterStore};
use crate::error::StoreError;
use async_trait::async_trait;
use quill_protocol::ChapterId;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// One JSON document per chapter under a data directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a data directory
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| StoreError::Io {
                path: root.clone(),
                source,
            })?;
        Ok(Self { root })
    }

    /// Data directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: ChapterId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }
}

#[async_trait]
impl ChapterStore for FileStore {
    async fn get(&self, id: ChapterId) -> Result<Option<ChapterRecord>, StoreError> {
        let path = self.path_for(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corrupt { path, source })
    }

    async fn put(&self, record: ChapterRecord) -> Result<(), StoreError> {
        let path = self.path_for(record.id);
        // Unique per write; concurrent writers must never share a temp file
        let tmp = self
            .root
            .join(format!(".{}.{}.tmp", record.id, Uuid::new_v4().simple()));
        let bytes = serde_json::to_vec_pretty(&record).map_err(|source| StoreError::Corrupt {
            path: path.clone(),
            source,
        })?;

        if let Err(source) = tokio::fs::write(&tmp, &bytes).await {
            discard(&tmp).await;
            return Err(StoreError::Io { path: tmp, source });
        }
        if let Err(source) = tokio::fs::rename(&tmp, &path).await {
            discard(&tmp).await;
            return Err(StoreError::Io { path, source });
        }

        debug!(chapter = %record.id, path = %path.display(), "chapter written");
        Ok(())
    }
}

async fn discard(tmp: &Path) {
    match tokio::fs::remove_file(tmp).await {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!(path = %tmp.display(), error = %err, "temp file left behind"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_protocol::PatchableField;

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("chapters")).await.unwrap();
        let record = ChapterRecord::new(ChapterId::new(), "Disk").with_text(PatchableField::Content, "body");

        store.put(record.clone()).await.unwrap();
        assert_eq!(store.get(record.id).await.unwrap(), Some(record.clone()));

        // A second store over the same directory sees the same data.
        let reopened = FileStore::open(store.root()).await.unwrap();
        assert_eq!(reopened.get(record.id).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(store.get(ChapterId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let id = ChapterId::new();
        tokio::fs::write(dir.path().join(format!("{id}.json")), b"not json")
            .await
            .unwrap();
        assert!(matches!(store.get(id).await, Err(StoreError::Corrupt { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writes_to_one_chapter_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FileStore::open(dir.path()).await.unwrap());
        let id = ChapterId::new();

        let writers: Vec<_> = (0..16)
            .map(|n| {
                let store = std::sync::Arc::clone(&store);
                let record = ChapterRecord::new(id, format!("take {n}"));
                tokio::spawn(async move { store.put(record).await })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let stored = store.get(id).await.unwrap().unwrap();
        assert!(stored.text_of(PatchableField::Title).starts_with("take "));
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec![format!("{id}.json")]);
    }
}
