//! Protocol types for vod-dl
//!
//! This module contains all types that cross the manager boundary:
//! - Task identity, status and progress
//! - History records and running statistics
//! - Events emitted by the download manager
//!
//! These types are serializable so a front end can forward them over IPC
//! or store them as-is.

mod events;
mod status;
mod types;

pub use events::ManagerEvent;
pub use status::{format_size, HistoryRecord, ManagerSnapshot, Statistics, SPEED_SAMPLE_CAPACITY};
pub use types::{DownloadTask, TaskId, TaskProgress, TaskStatus};
