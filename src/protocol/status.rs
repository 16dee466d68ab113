//! Status types
//!
//! History records, running statistics and manager snapshots.

use super::types::DownloadTask;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Maximum number of throughput samples kept for the running average
pub const SPEED_SAMPLE_CAPACITY: usize = 100;

/// Latest known status of one task name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub name: String,
    pub status_text: String,
    pub timestamp: DateTime<Utc>,
}

/// Running statistics over successful downloads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    /// Number of completed downloads
    pub total_downloads: u64,
    /// Sum of completed download sizes
    pub total_size_bytes: u64,
    /// Mean of `speed_samples` in bytes/sec
    pub average_speed_bps: f64,
    /// Throughput of recent completed downloads in bytes/sec (bounded)
    pub speed_samples: VecDeque<f64>,
}

impl Statistics {
    /// Account for one successful download
    pub fn record_download(&mut self, size_bytes: u64, elapsed: Duration) {
        self.total_downloads += 1;
        self.total_size_bytes += size_bytes;

        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            self.speed_samples.push_back(size_bytes as f64 / secs);
            while self.speed_samples.len() > SPEED_SAMPLE_CAPACITY {
                self.speed_samples.pop_front();
            }
        }

        self.average_speed_bps = if self.speed_samples.is_empty() {
            0.0
        } else {
            self.speed_samples.iter().sum::<f64>() / self.speed_samples.len() as f64
        };
    }
}

/// Point-in-time view of the download manager
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagerSnapshot {
    /// Task holding the active slot (Active or Paused)
    pub active: Option<DownloadTask>,
    /// Waiting tasks in FIFO order
    pub queued: Vec<DownloadTask>,
    /// History, most recent first
    pub history: Vec<HistoryRecord>,
    pub stats: Statistics,
}

/// Human-readable byte size with two decimals
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{:.2} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.2} TB", size)
}
