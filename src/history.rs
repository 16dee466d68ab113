//! Download history
//!
//! Keeps the latest status line for each task name. Recording a name that
//! is already present replaces its line and moves it to the front.

use crate::protocol::HistoryRecord;
use chrono::Utc;

#[derive(Debug, Default)]
pub struct HistoryLog {
    /// Oldest first
    records: Vec<HistoryRecord>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `status_text` as the latest status of `name`
    pub fn record(&mut self, name: &str, status_text: impl Into<String>) {
        let status_text = status_text.into();
        tracing::debug!("History: {} -> {}", name, status_text);

        self.records.retain(|r| r.name != name);
        self.records.push(HistoryRecord {
            name: name.to_string(),
            status_text,
            timestamp: Utc::now(),
        });
    }

    /// All records, most recent first
    pub fn entries(&self) -> Vec<HistoryRecord> {
        self.records.iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
