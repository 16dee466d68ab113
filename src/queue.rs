//! FIFO of pending downloads
//!
//! Tasks wait here in arrival order until the manager hands the head to
//! the engine. Names are what callers address tasks by, so removal is by
//! name and takes the earliest match.

use crate::protocol::DownloadTask;
use std::collections::VecDeque;

/// Arrival-ordered queue of waiting tasks
#[derive(Debug, Default)]
pub struct TaskQueue {
    waiting: VecDeque<DownloadTask>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task at the tail
    pub fn push(&mut self, task: DownloadTask) {
        self.waiting.push_back(task);
    }

    /// Take the head of the queue
    pub fn pop(&mut self) -> Option<DownloadTask> {
        self.waiting.pop_front()
    }

    /// Remove the first task called `name`
    pub fn remove_by_name(&mut self, name: &str) -> Option<DownloadTask> {
        let index = self.waiting.iter().position(|t| t.name == name)?;
        self.waiting.remove(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DownloadTask> {
        self.waiting.iter()
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    /// Remove every waiting task, in queue order
    pub fn drain(&mut self) -> Vec<DownloadTask> {
        self.waiting.drain(..).collect()
    }
}
