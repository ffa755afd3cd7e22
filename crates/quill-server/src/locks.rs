//! Per-chapter write locks
//!
//! Every read-modify-write of a [`ChapterRecord`](crate::store::ChapterRecord)
//! runs under its chapter's lock, whichever column it touches. Entries live
//! only while someone holds or waits for them.

use dashmap::DashMap;
use quill_protocol::ChapterId;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lock table shared by every service that writes chapters
#[derive(Debug, Default)]
pub struct ChapterLocks {
    locks: DashMap<ChapterId, Arc<Mutex<()>>>,
}

impl ChapterLocks {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`
    pub async fn lock(&self, id: ChapterId) -> ChapterGuard<'_> {
        let mutex = Arc::clone(self.locks.entry(id).or_default().value());
        let guard = mutex.lock_owned().await;
        ChapterGuard {
            table: self,
            id,
            guard: Some(guard),
        }
    }

    /// Chapters currently locked or waited on
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// No chapter is locked
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one chapter; released on drop
#[derive(Debug)]
pub struct ChapterGuard<'a> {
    table: &'a ChapterLocks,
    id: ChapterId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ChapterGuard<'_> {
    fn drop(&mut self) {
        // Release first so the table holds the last reference when idle
        drop(self.guard.take());
        self.table
            .locks
            .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
