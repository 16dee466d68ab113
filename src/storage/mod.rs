//! Storage Module
//!
//! This module persists the client configuration record, including the
//! running statistics the download manager updates after each completion.

pub mod json;

pub use json::JsonFileStore;

use crate::config::ClientConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Storage trait for persisting the configuration record
///
/// Implementations load and save the whole record at once; the download
/// manager calls `save` right after it updates the statistics.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load the configuration, falling back to defaults when nothing is stored
    async fn load(&self) -> Result<ClientConfig>;

    /// Save or replace the configuration
    async fn save(&self, config: &ClientConfig) -> Result<()>;
}

/// In-memory storage for testing
#[derive(Debug, Default)]
pub struct MemoryStore {
    config: parking_lot::RwLock<Option<ClientConfig>>,
    saves: std::sync::atomic::AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `config`
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config: parking_lot::RwLock::new(Some(config)),
            saves: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Last saved configuration, if any
    pub fn stored(&self) -> Option<ClientConfig> {
        self.config.read().clone()
    }

    /// Number of successful `save` calls
    pub fn save_count(&self) -> usize {
        self.saves.load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn load(&self) -> Result<ClientConfig> {
        Ok(self.config.read().clone().unwrap_or_default())
    }

    async fn save(&self, config: &ClientConfig) -> Result<()> {
        *self.config.write() = Some(config.clone());
        self.saves
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(())
    }
}
