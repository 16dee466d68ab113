//! Manager events
//!
//! Events broadcast by the download manager, tagged with the task name.

use super::types::TaskProgress;
use serde::{Deserialize, Serialize};

/// Events emitted by the download manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ManagerEvent {
    /// Task was appended to the queue
    Queued { name: String },
    /// Task took the active slot and its engine started
    Started { name: String },
    /// Progress update for the active task
    Progress { name: String, progress: TaskProgress },
    /// Active task was paused
    Paused { name: String },
    /// Active task was resumed
    Resumed { name: String },
    /// Task finished successfully
    Completed { name: String, total_bytes: u64 },
    /// Task finished with an error
    Failed { name: String, error: String },
    /// Task was cancelled (active or queued)
    Cancelled { name: String },
    /// Queue, active slot or history changed
    QueueUpdated,
}

impl ManagerEvent {
    /// Name of the task the event refers to, if any
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Queued { name }
            | Self::Started { name }
            | Self::Progress { name, .. }
            | Self::Paused { name }
            | Self::Resumed { name }
            | Self::Completed { name, .. }
            | Self::Failed { name, .. }
            | Self::Cancelled { name } => Some(name),
            Self::QueueUpdated => None,
        }
    }
}
