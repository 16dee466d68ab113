//! # vod-dl
//!
//! An IPTV video-on-demand catalog reader and sequential download manager.
//!
//! ## Features
//!
//! - **Playlist parsing**: Extended M3U catalogs with per-entry metadata
//! - **Cancellable fetching**: Playlist downloads report coarse phases and
//!   stop cleanly between them
//! - **Download queue**: One active transfer at a time, FIFO for the rest,
//!   with pause, resume, cancel and per-task bandwidth pacing
//! - **Statistics**: Running totals persisted with the configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vod_dl::{ClientConfig, DownloadManager, JsonFileStore, PlaylistFetcher};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(JsonFileStore::default_location());
//!     let manager = DownloadManager::load(store).await?;
//!
//!     let config = ClientConfig::default();
//!     let fetcher = PlaylistFetcher::new(&config.http)?;
//!     let playlist = fetcher
//!         .fetch("http://panel.example/get.php", &CancellationToken::new(), |_| {})
//!         .await?;
//!
//!     let mut events = manager.subscribe();
//!     for entry in playlist.entries.iter().take(2) {
//!         manager.enqueue(&entry.title, &entry.media_url, None).await?;
//!     }
//!
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Modules
pub mod config;
pub mod engine;
pub mod error;
pub mod filename;
pub mod history;
pub mod http;
pub mod manager;
pub mod playlist;
pub mod protocol;
pub mod queue;
pub mod storage;

// Re-exports for convenience
pub use config::{ClientConfig, HttpConfig};
pub use engine::{
    DownloadEngine, EngineEvent, EngineHandle, EngineNotification, EngineSettings,
    TransferRequest, TransferSummary,
};
pub use error::{Error, FileSystemErrorKind, FormatErrorKind, NetworkErrorKind, Result};
pub use manager::DownloadManager;
pub use playlist::{
    EntryFilter, EntryMetadata, FetchHandle, FetchPhase, Playlist, PlaylistEntry,
    PlaylistFetcher, SortOrder,
};
pub use protocol::{
    format_size, DownloadTask, HistoryRecord, ManagerEvent, ManagerSnapshot, Statistics, TaskId,
    TaskProgress, TaskStatus,
};

// Storage exports
pub use storage::{ConfigStore, JsonFileStore, MemoryStore};

// Queue exports
pub use queue::TaskQueue;
