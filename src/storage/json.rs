//! JSON file storage
//!
//! Keeps the configuration record in a single pretty-printed JSON file.
//! A missing file yields defaults; a corrupt file is logged and also
//! yields defaults.

use super::ConfigStore;
use crate::config::{default_config_path, ClientConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// File-backed configuration store
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform configuration location
    pub fn default_location() -> Self {
        Self::new(default_config_path())
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigStore for JsonFileStore {
    async fn load(&self) -> Result<ClientConfig> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No configuration at {:?}, using defaults", self.path);
                return Ok(ClientConfig::default());
            }
            Err(e) => {
                tracing::error!("Failed to read configuration {:?}: {}", self.path, e);
                return Ok(ClientConfig::default());
            }
        };

        match serde_json::from_slice::<ClientConfig>(&data) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!("Failed to parse configuration {:?}: {}", self.path, e);
                Ok(ClientConfig::default())
            }
        }
    }

    async fn save(&self, config: &ClientConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| Error::io(parent, e))?;
            }
        }

        let json = serde_json::to_vec_pretty(config)?;

        // Readers never observe a partially written record
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| Error::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::io(&self.path, e))?;

        tracing::info!("Configuration saved to {:?}", self.path);
        Ok(())
    }
}
