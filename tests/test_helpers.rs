//! Test Helpers
//!
//! This module provides helper functions and builders for creating test data
//! such as playlists, media bodies and managers backed by temp directories.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::time::timeout;
use vod_dl::{ClientConfig, DownloadManager, ManagerEvent, MemoryStore};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builder for extended M3U playlist text
#[derive(Default)]
pub struct PlaylistBuilder {
    lines: Vec<String>,
}

impl PlaylistBuilder {
    pub fn new() -> Self {
        Self {
            lines: vec!["#EXTM3U".to_string()],
        }
    }

    /// Add a VOD entry with the common attributes
    pub fn entry(mut self, title: &str, group: &str, url: &str) -> Self {
        self.lines.push(format!(
            "#EXTINF:-1 xui-id=\"{}\" tvg-name=\"{}\" tvg-logo=\"http://img.example/{}.png\" group-title=\"{}\",{}",
            self.lines.len(),
            title,
            self.lines.len(),
            group,
            title
        ));
        self.lines.push(url.to_string());
        self
    }

    /// Add a raw line
    pub fn line(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    pub fn build(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

/// Deterministic media content of `len` bytes
pub fn media_body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Serve `body` for GET requests on `route`
pub async fn mount_media(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

/// Serve `status` with an empty body for GET requests on `route`
pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Create a manager writing into `temp_dir` with small transfer chunks
pub async fn create_test_manager(
    temp_dir: &TempDir,
    chunk_size: usize,
) -> (DownloadManager, Arc<MemoryStore>) {
    let config = ClientConfig::new()
        .download_dir(temp_dir.path())
        .chunk_size(chunk_size);
    let store = Arc::new(MemoryStore::with_config(config.clone()));
    let manager = DownloadManager::new(config, store.clone())
        .await
        .expect("Failed to create manager");
    (manager, store)
}

/// Wait for the first event matching `predicate`
pub async fn wait_for_event<F>(
    rx: &mut broadcast::Receiver<ManagerEvent>,
    predicate: F,
    timeout_duration: Duration,
) -> Option<ManagerEvent>
where
    F: Fn(&ManagerEvent) -> bool,
{
    let result = timeout(timeout_duration, async {
        loop {
            match rx.recv().await {
                Ok(event) if predicate(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await;
    result.unwrap_or(None)
}

/// Wait for a terminal event for `name`
pub async fn wait_for_finish(
    rx: &mut broadcast::Receiver<ManagerEvent>,
    name: &str,
    timeout_duration: Duration,
) -> Option<ManagerEvent> {
    wait_for_event(
        rx,
        |e| {
            e.name() == Some(name)
                && matches!(
                    e,
                    ManagerEvent::Completed { .. }
                        | ManagerEvent::Failed { .. }
                        | ManagerEvent::Cancelled { .. }
                )
        },
        timeout_duration,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_builder() {
        let text = PlaylistBuilder::new()
            .entry("Movie", "Films", "http://media.example/1.mp4")
            .build();
        let playlist = vod_dl::playlist::parse(&text).expect("valid playlist");
        assert_eq!(playlist.len(), 1);
        assert_eq!(
            playlist.get("Movie").and_then(|m| m.group_title.as_deref()),
            Some("Films")
        );
    }
}
