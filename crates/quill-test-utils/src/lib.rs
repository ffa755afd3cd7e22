//! Testing utilities for Quill workspace
//!
//! Shared fakes and fixtures for integration tests.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use quill_autosave::{Beacon, PatchTransport, SaveError, SaveListener};
use quill_protocol::{ChapterId, ErrorCode, PatchApplied, PatchRequest, PatchableField};
use quill_server::{ChapterRecord, ChapterStore, MemoryStore, PatchService, StoreError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Transport answering from a queue of canned replies
///
/// When the queue is empty every submission succeeds.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<PatchApplied, SaveError>>>,
    requests: Mutex<Vec<PatchRequest>>,
    server_text: Mutex<String>,
    fetches: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_ok(&self, field: PatchableField, new_length: usize) {
        self.replies.lock().push_back(Ok(PatchApplied { field, new_length }));
    }

    pub fn push_rejection(&self, code: ErrorCode) {
        self.replies
            .lock()
            .push_back(Err(SaveError::rejected(code, format!("scripted {code}"))));
    }

    pub fn push_transport_error(&self) {
        self.replies
            .lock()
            .push_back(Err(SaveError::Transport("scripted network failure".to_string())));
    }

    /// Reply with `code` for the next `n` submissions
    pub fn fail_next(&self, n: usize, code: ErrorCode) {
        for _ in 0..n {
            self.push_rejection(code);
        }
    }

    /// Text returned by `fetch_field`
    pub fn set_server_text(&self, text: &str) {
        *self.server_text.lock() = text.to_string();
    }

    pub fn requests(&self) -> Vec<PatchRequest> {
        self.requests.lock().clone()
    }

    pub fn submissions(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PatchTransport for ScriptedTransport {
    async fn submit(&self, request: &PatchRequest) -> Result<PatchApplied, SaveError> {
        self.requests.lock().push(request.clone());
        let scripted = self.replies.lock().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(PatchApplied {
                field: request.field.parse().unwrap_or(PatchableField::Content),
                new_length: 0,
            })
        })
    }

    async fn fetch_field(
        &self,
        _record_id: ChapterId,
        _field: PatchableField,
    ) -> Result<String, SaveError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.server_text.lock().clone())
    }
}

/// Transport calling a [`PatchService`] directly
#[derive(Debug, Clone)]
pub struct InProcessTransport {
    service: Arc<PatchService>,
}

impl InProcessTransport {
    pub fn new(service: Arc<PatchService>) -> Arc<Self> {
        Arc::new(Self { service })
    }
}

#[async_trait]
impl PatchTransport for InProcessTransport {
    async fn submit(&self, request: &PatchRequest) -> Result<PatchApplied, SaveError> {
        self.service
            .apply_field_patch(&request.record_id, &request.field, &request.patch_text)
            .await
            .map_err(|err| SaveError::rejected(err.code(), err.to_string()))
    }

    async fn fetch_field(
        &self,
        record_id: ChapterId,
        field: PatchableField,
    ) -> Result<String, SaveError> {
        self.service
            .read_field(&record_id.to_string(), field.as_str())
            .await
            .map(|value| value.value)
            .map_err(|err| SaveError::rejected(err.code(), err.to_string()))
    }
}

/// Memory store whose reads or writes can be switched to fail
///
/// With [`yield_after_get`](Self::yield_after_get) every read hands control
/// back to the scheduler before returning, so concurrent read-modify-write
/// cycles interleave unless something serialises them.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_gets: AtomicBool,
    fail_puts: AtomicBool,
    panic_on_get: AtomicBool,
    yield_after_get: AtomicBool,
    puts: AtomicUsize,
}

impl FailingStore {
    pub fn with_records(records: impl IntoIterator<Item = ChapterRecord>) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::with_records(records),
            ..Self::default()
        })
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn panic_on_get(&self, panic: bool) {
        self.panic_on_get.store(panic, Ordering::SeqCst);
    }

    pub fn yield_after_get(&self, yield_now: bool) {
        self.yield_after_get.store(yield_now, Ordering::SeqCst);
    }

    /// Successful writes so far
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChapterStore for FailingStore {
    async fn get(&self, id: ChapterId) -> Result<Option<ChapterRecord>, StoreError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        assert!(!self.panic_on_get.load(Ordering::SeqCst), "store read panicked");
        let record = self.inner.get(id).await;
        if self.yield_after_get.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        record
    }

    async fn put(&self, record: ChapterRecord) -> Result<(), StoreError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(record).await
    }
}

/// Beacon recording every payload
#[derive(Debug)]
pub struct RecordingBeacon {
    accept: AtomicBool,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingBeacon {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            accept: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn refusing() -> Arc<Self> {
        let beacon = Self::accepting();
        beacon.accept.store(false, Ordering::SeqCst);
        beacon
    }

    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }
}

impl Beacon for RecordingBeacon {
    fn send(&self, url: &str, body: String) -> bool {
        self.sent.lock().push((url.to_string(), body));
        self.accept.load(Ordering::SeqCst)
    }
}

/// Listener counting callbacks per kind
#[derive(Debug, Default)]
pub struct CountingListener {
    saved: AtomicUsize,
    errors: Mutex<Vec<(PatchableField, String)>>,
}

impl CountingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn saved(&self) -> usize {
        self.saved.load(Ordering::SeqCst)
    }

    pub fn errors(&self) -> Vec<(PatchableField, String)> {
        self.errors.lock().clone()
    }
}

impl SaveListener for CountingListener {
    fn on_saved(&self, _field: PatchableField, _applied: &PatchApplied) {
        self.saved.fetch_add(1, Ordering::SeqCst);
    }

    fn on_error(&self, field: PatchableField, error: &SaveError) {
        self.errors.lock().push((field, error.to_string()));
    }
}

/// Chapter with `text` in `field`
pub fn chapter_with(field: PatchableField, text: &str) -> ChapterRecord {
    ChapterRecord::new(ChapterId::new(), "Test chapter").with_text(field, text)
}

/// Patch service over a memory store holding `records`
pub fn memory_service(
    records: impl IntoIterator<Item = ChapterRecord>,
) -> (Arc<MemoryStore>, Arc<PatchService>) {
    let store = Arc::new(MemoryStore::with_records(records));
    let service = Arc::new(PatchService::new(store.clone()));
    (store, service)
}
