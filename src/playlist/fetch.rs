//! Playlist fetching
//!
//! Downloads playlist text over HTTP and hands it to the parser. Progress
//! is reported in three coarse phases. Cancellation is cooperative and only
//! observed between phases: an in-flight read always runs to completion and
//! its result is thrown away.

use super::{parse, Playlist};
use crate::config::HttpConfig;
use crate::error::{Error, NetworkErrorKind, Result};
use crate::http::playlist_client;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Coarse progress of a playlist fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchPhase {
    /// Sending the request
    Connecting,
    /// Reading the response body
    Downloading,
    /// Parsing the playlist text
    Parsing,
}

impl std::fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting to server..."),
            Self::Downloading => write!(f, "Downloading content..."),
            Self::Parsing => write!(f, "Parsing content..."),
        }
    }
}

/// Playlist fetcher
pub struct PlaylistFetcher {
    client: Client,
    /// Token of the most recently spawned fetch
    current: Mutex<Option<CancellationToken>>,
}

/// Handle to a spawned playlist fetch
pub struct FetchHandle {
    cancel: CancellationToken,
    phases: mpsc::UnboundedReceiver<FetchPhase>,
    task: JoinHandle<Result<Playlist>>,
}

impl PlaylistFetcher {
    /// Create a fetcher with the playlist client settings from `config`
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self::with_client(playlist_client(config)?))
    }

    /// Create a fetcher around an existing client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            current: Mutex::new(None),
        }
    }

    /// Fetch and parse the playlist at `url`.
    ///
    /// `on_phase` is called as each phase begins. Returns
    /// [`Error::Cancelled`] once `cancel` has fired, in place of any
    /// result or error produced after that.
    pub async fn fetch<F>(&self, url: &str, cancel: &CancellationToken, on_phase: F) -> Result<Playlist>
    where
        F: Fn(FetchPhase),
    {
        fetch_playlist(&self.client, url, cancel, on_phase).await
    }

    /// Start fetching in the background.
    ///
    /// Only one fetch runs at a time: starting a new one cancels the
    /// previously spawned fetch.
    pub fn spawn(&self, url: impl Into<String>) -> FetchHandle {
        let url = url.into();
        let cancel = CancellationToken::new();
        if let Some(previous) = self.current.lock().replace(cancel.clone()) {
            tracing::debug!("Cancelling previous playlist fetch");
            previous.cancel();
        }

        let (phase_tx, phases) = mpsc::unbounded_channel();
        let client = self.client.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            fetch_playlist(&client, &url, &task_cancel, |phase| {
                let _ = phase_tx.send(phase);
            })
            .await
        });

        FetchHandle {
            cancel,
            phases,
            task,
        }
    }
}

impl FetchHandle {
    /// Request cancellation; observed at the next phase boundary
    pub fn cancel(&self) {
        tracing::debug!("Playlist fetch stop requested");
        self.cancel.cancel();
    }

    /// Receive the next phase; `None` once the fetch has finished
    pub async fn next_phase(&mut self) -> Option<FetchPhase> {
        self.phases.recv().await
    }

    /// Wait for the fetch to finish
    pub async fn join(self) -> Result<Playlist> {
        self.task
            .await
            .map_err(|e| Error::Unknown(format!("Playlist fetch task failed: {}", e)))?
    }

    /// Cancel and wait for the worker to exit, discarding its result
    pub async fn stop(self) {
        self.cancel();
        let _ = self.task.await;
    }
}

async fn fetch_playlist<F>(
    client: &Client,
    url: &str,
    cancel: &CancellationToken,
    on_phase: F,
) -> Result<Playlist>
where
    F: Fn(FetchPhase),
{
    match load_playlist(client, url, cancel, on_phase).await {
        Err(e) if cancel.is_cancelled() && !matches!(e, Error::Cancelled) => {
            tracing::debug!("Discarding playlist error after cancel: {}", e);
            Err(Error::Cancelled)
        }
        other => other,
    }
}

async fn load_playlist<F>(
    client: &Client,
    url: &str,
    cancel: &CancellationToken,
    on_phase: F,
) -> Result<Playlist>
where
    F: Fn(FetchPhase),
{
    url::Url::parse(url)
        .map_err(|e| Error::invalid_input("playlist_url", format!("Invalid URL: {}", e)))?;

    tracing::debug!("Loading playlist from {}", url);
    on_phase(FetchPhase::Connecting);

    if cancel.is_cancelled() {
        tracing::debug!("Playlist fetch cancelled before connecting");
        return Err(Error::Cancelled);
    }

    let response = client.get(url).send().await.map_err(|e| {
        tracing::error!("Playlist request failed: {}", e);
        Error::from(e)
    })?;

    let status = response.status();
    if !status.is_success() {
        tracing::error!("Playlist request returned HTTP {}", status.as_u16());
        return Err(Error::network(
            NetworkErrorKind::HttpStatus(status.as_u16()),
            format!("HTTP error: {}", status),
        ));
    }

    if cancel.is_cancelled() {
        tracing::debug!("Playlist fetch cancelled after connecting");
        return Err(Error::Cancelled);
    }

    on_phase(FetchPhase::Downloading);
    let content = response.text().await?;

    if cancel.is_cancelled() {
        tracing::debug!("Playlist fetch cancelled after download");
        return Err(Error::Cancelled);
    }

    on_phase(FetchPhase::Parsing);
    if cancel.is_cancelled() {
        tracing::debug!("Playlist fetch cancelled before parsing");
        return Err(Error::Cancelled);
    }

    let playlist = parse(&content)?;

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    tracing::info!("Playlist loaded: {} entries", playlist.len());
    Ok(playlist)
}
