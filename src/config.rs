//! Client configuration
//!
//! This module contains the persisted configuration record and the
//! resolution rules for the download directory.

use crate::error::{Error, Result};
use crate::protocol::Statistics;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Browser-like identifier sent to IPTV playlist endpoints
pub const PLAYLIST_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Main configuration record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// URL of the M3U playlist
    pub playlist_url: String,

    /// Default pacing limit in KB/s (0 = unlimited)
    pub bandwidth_limit_kbs: u64,

    /// Directory to save downloads (None = platform downloads directory)
    pub download_dir: Option<PathBuf>,

    /// Running download statistics
    pub stats: Statistics,

    /// HTTP configuration
    pub http: HttpConfig,
}

/// HTTP-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User agent for media downloads
    pub user_agent: String,

    /// User agent for playlist fetches
    pub playlist_user_agent: String,

    /// Total timeout for a playlist fetch in seconds
    pub playlist_timeout_secs: u64,

    /// Connection timeout for media downloads in seconds
    pub connect_timeout_secs: u64,

    /// Bytes handed to the transfer loop per iteration
    pub chunk_size: usize,

    /// Extension used when the media URL carries none
    pub default_extension: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            playlist_url: String::new(),
            bandwidth_limit_kbs: 0,
            download_dir: None,
            stats: Statistics::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("vod-dl/{}", env!("CARGO_PKG_VERSION")),
            playlist_user_agent: PLAYLIST_USER_AGENT.to_string(),
            playlist_timeout_secs: 30,
            connect_timeout_secs: 30,
            chunk_size: 1024 * 1024, // 1 MiB
            default_extension: "mp4".to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the playlist URL
    pub fn playlist_url(mut self, url: impl Into<String>) -> Self {
        self.playlist_url = url.into();
        self
    }

    /// Set the default bandwidth limit in KB/s (0 = unlimited)
    pub fn bandwidth_limit(mut self, kbs: u64) -> Self {
        self.bandwidth_limit_kbs = kbs;
        self
    }

    /// Set the download directory
    pub fn download_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(path.into());
        self
    }

    /// Set the transfer chunk size
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.http.chunk_size = bytes;
        self
    }

    /// Default limit as an optional value
    pub fn bandwidth_limit_option(&self) -> Option<u64> {
        Some(self.bandwidth_limit_kbs).filter(|l| *l > 0)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.http.chunk_size == 0 {
            return Err(Error::invalid_input("chunk_size", "Must be at least 1"));
        }

        if self.http.playlist_timeout_secs == 0 {
            return Err(Error::invalid_input(
                "playlist_timeout_secs",
                "Must be at least 1",
            ));
        }

        if self.http.default_extension.is_empty()
            || !self
                .http
                .default_extension
                .chars()
                .all(|c| c.is_ascii_alphanumeric())
        {
            return Err(Error::invalid_input(
                "default_extension",
                format!("Invalid extension: {:?}", self.http.default_extension),
            ));
        }

        Ok(())
    }

    /// Pick the directory downloads are written to.
    ///
    /// The configured directory wins when it is (or can be made) a writable
    /// directory. Otherwise the platform downloads directory is used, then
    /// `./downloads`.
    pub async fn resolve_download_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.download_dir {
            if is_writable_dir(dir).await {
                return dir.clone();
            }
            tracing::warn!(
                "Configured download directory {:?} is not writable, falling back",
                dir
            );
        }

        if let Some(dir) = dirs::download_dir() {
            if is_writable_dir(&dir).await {
                return dir;
            }
        }

        PathBuf::from("downloads")
    }
}

/// Check that `dir` exists (creating it if needed) and accepts new files
pub async fn is_writable_dir(dir: &Path) -> bool {
    if tokio::fs::create_dir_all(dir).await.is_err() {
        return false;
    }

    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => {}
        _ => return false,
    }

    let check_file = dir.join(format!(".vod-dl-write-check-{}", std::process::id()));
    match tokio::fs::File::create(&check_file).await {
        Ok(file) => {
            drop(file);
            let _ = tokio::fs::remove_file(&check_file).await;
            true
        }
        Err(_) => false,
    }
}

/// Default location of the persisted configuration file
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vod-dl")
        .join("config.json")
}
