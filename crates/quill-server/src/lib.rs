//! Quill Server - chapter patch endpoint
//!
//! Server side of the autosave pipeline:
//! - Validates and applies field patches with all-or-nothing semantics
//! - Serialises concurrent writes to the same chapter
//! - Accepts unload-time metadata snapshots
//! - Persists chapters in memory or as JSON files
//!
//! # Example
//!
//! ```rust,ignore
//! use quill_server::{app_state, open_store, routes::routes, ServerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::default();
//! let store = open_store(&config).await?;
//! warp::serve(routes(app_state(store, &config))).run(config.bind_addr()?).await;
//! # Ok(())
//! # }
//! ```

pub mod assist;
pub mod config;
pub mod error;
pub mod locks;
pub mod metadata;
pub mod patch;
pub mod routes;
pub mod store;
pub mod telemetry;

pub use assist::{AssistConfig, GeminiClient, Generation, TextGenerator};
pub use config::{PatchSettings, ServerConfig};
pub use error::{ConfigError, EndpointError, MetadataError, StoreError};
pub use locks::{ChapterGuard, ChapterLocks};
pub use metadata::MetadataService;
pub use patch::PatchService;
pub use routes::AppState;
pub use store::{ChapterRecord, ChapterStore, FileStore, MemoryStore};

use quill_patch::PatchCodec;
use std::sync::Arc;
use tracing::info;

/// Store selected by the config: files under `data_dir`, else memory
///
/// # Errors
///
/// Returns [`StoreError`] if the data directory cannot be created.
pub async fn open_store(config: &ServerConfig) -> Result<Arc<dyn ChapterStore>, StoreError> {
    match &config.data_dir {
        Some(dir) => {
            let store = FileStore::open(dir).await?;
            info!(data_dir = %dir.display(), "using file store");
            Ok(Arc::new(store))
        }
        None => {
            info!("using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Handler state over `store`
#[must_use]
pub fn app_state(store: Arc<dyn ChapterStore>, config: &ServerConfig) -> AppState {
    let codec = PatchCodec::new(config.patch.options());
    let locks = Arc::new(ChapterLocks::new());
    AppState {
        patches: Arc::new(
            PatchService::with_codec(Arc::clone(&store), codec).with_locks(Arc::clone(&locks)),
        ),
        metadata: Arc::new(MetadataService::new(store).with_locks(locks)),
        max_body_bytes: config.max_body_bytes,
    }
}
