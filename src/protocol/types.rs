//! Core protocol types
//!
//! Fundamental types used throughout the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one queued download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Create a new random task ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short 8-character form used in log lines
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short())
    }
}

/// Lifecycle state of a download task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting in the FIFO
    Queued,
    /// Currently transferring bytes
    Active,
    /// Active but suspended by the user
    Paused,
    /// Finished successfully
    Completed,
    /// Stopped by the user
    Cancelled,
    /// Finished with an error
    Failed,
}

impl TaskStatus {
    /// Whether this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Label used in the history log
    pub fn label(&self) -> &'static str {
        match self {
            Self::Queued => "Queued",
            Self::Active => "Active",
            Self::Paused => "Paused",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Progress snapshot reported by the download engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskProgress {
    /// Whole percent, 0-100
    pub percent: u8,
    /// Bytes written so far
    pub downloaded_bytes: u64,
    /// Announced size in bytes
    pub total_bytes: u64,
    /// Mean of the recent throughput samples in KB/s
    pub speed_kbs: f64,
}

impl TaskProgress {
    pub fn new(downloaded_bytes: u64, total_bytes: u64, speed_kbs: f64) -> Self {
        let percent = if total_bytes > 0 {
            ((downloaded_bytes.min(total_bytes) * 100) / total_bytes) as u8
        } else {
            0
        };
        Self {
            percent,
            downloaded_bytes,
            total_bytes,
            speed_kbs,
        }
    }
}

/// A download request and its live counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadTask {
    pub id: TaskId,
    /// Display name; also the base of the output filename
    pub name: String,
    pub url: String,
    /// Pacing limit in KB/s, `None` for unlimited
    pub bandwidth_limit_kbs: Option<u64>,
    pub status: TaskStatus,
    pub total_bytes: u64,
    pub downloaded_bytes: u64,
    pub current_speed_kbs: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DownloadTask {
    /// Create a freshly queued task
    pub fn new(name: impl Into<String>, url: impl Into<String>, limit_kbs: Option<u64>) -> Self {
        Self {
            id: TaskId::new(),
            name: name.into(),
            url: url.into(),
            bandwidth_limit_kbs: limit_kbs.filter(|l| *l > 0),
            status: TaskStatus::Queued,
            total_bytes: 0,
            downloaded_bytes: 0,
            current_speed_kbs: 0.0,
            started_at: None,
            finished_at: None,
        }
    }

    /// Apply a progress report to the counters
    pub fn apply_progress(&mut self, progress: &TaskProgress) {
        self.total_bytes = progress.total_bytes;
        self.downloaded_bytes = progress.downloaded_bytes;
        self.current_speed_kbs = progress.speed_kbs;
    }

    /// Percentage complete (0.0 - 100.0)
    pub fn percentage(&self) -> f64 {
        if self.total_bytes > 0 {
            (self.downloaded_bytes as f64 / self.total_bytes as f64) * 100.0
        } else {
            0.0
        }
    }
}
