//! Download Engine - single-file transfer worker
//!
//! A `DownloadEngine` streams one media URL to disk per started transfer.
//! Each transfer runs on its own tokio task and reports back through an
//! unbounded channel, so the receiver can join a stopped transfer without
//! ever blocking the sender.

use crate::config::HttpConfig;
use crate::error::{Error, NetworkErrorKind, Result};
use crate::filename::output_file_name;
use crate::http::{pacing_delay, SpeedCalculator};
use crate::protocol::{DownloadTask, TaskId, TaskProgress};
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Number of throughput samples averaged into the reported speed
const SPEED_WINDOW: usize = 3;

/// Minimum time between throughput samples
const SPEED_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Settings shared by every transfer an engine starts
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Directory files are written to, created on demand
    pub download_dir: PathBuf,
    /// Bytes written per loop iteration
    pub chunk_size: usize,
    /// Extension used when the media URL has none
    pub default_extension: String,
}

impl EngineSettings {
    pub fn new(download_dir: impl Into<PathBuf>, http: &HttpConfig) -> Self {
        Self {
            download_dir: download_dir.into(),
            chunk_size: http.chunk_size.max(1),
            default_extension: http.default_extension.clone(),
        }
    }
}

/// What to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub id: TaskId,
    pub name: String,
    pub url: String,
    /// Pacing limit in KB/s, `None` for unlimited
    pub limit_kbs: Option<u64>,
}

impl From<&DownloadTask> for TransferRequest {
    fn from(task: &DownloadTask) -> Self {
        Self {
            id: task.id,
            name: task.name.clone(),
            url: task.url.clone(),
            limit_kbs: task.bandwidth_limit_kbs,
        }
    }
}

/// Result of a finished transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSummary {
    pub path: PathBuf,
    /// Bytes written to `path`
    pub total_bytes: u64,
    /// Wall time from request to final sync
    pub elapsed: Duration,
}

/// Event reported by a running transfer
#[derive(Debug)]
pub enum EngineEvent {
    Progress(TaskProgress),
    Completed(TransferSummary),
    /// Terminal failure; `Error::Cancelled` after a stop
    Failed(Error),
}

/// An engine event tagged with the transfer it belongs to
#[derive(Debug)]
pub struct EngineNotification {
    pub id: TaskId,
    pub event: EngineEvent,
}

/// Stop and pause signals for one transfer
#[derive(Debug, Default)]
struct TransferControl {
    cancel: CancellationToken,
    paused: Mutex<bool>,
    resumed: Notify,
}

impl TransferControl {
    fn pause(&self) {
        *self.paused.lock() = true;
    }

    fn resume(&self) {
        *self.paused.lock() = false;
        self.resumed.notify_waiters();
    }

    fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    fn stop(&self) {
        self.cancel.cancel();
    }

    fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Block while paused. Returns `false` if stopped in the meantime.
    async fn wait_while_paused(&self) -> bool {
        loop {
            let notified = self.resumed.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a resume in between is not lost
            notified.as_mut().enable();

            if self.is_stopped() {
                return false;
            }
            if !self.is_paused() {
                return true;
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = self.cancel.cancelled() => return false,
            }
        }
    }
}

/// Handle to control a running transfer
#[derive(Debug)]
pub struct EngineHandle {
    id: TaskId,
    control: Arc<TransferControl>,
    /// Destination the transfer writes to
    path: PathBuf,
    task: JoinHandle<()>,
}

impl EngineHandle {
    /// Suspend the transfer after the current chunk
    pub fn pause(&self) {
        self.control.pause();
    }

    /// Continue a paused transfer
    pub fn resume(&self) {
        self.control.resume();
    }

    /// Wait for the worker task to exit and release its file
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::error!("[{}] Transfer task failed: {}", self.id.short(), e);
        }
    }

    /// Stop the transfer and wait for it to exit. The destination file is
    /// removed even if the transfer finished before the stop was seen.
    pub async fn cancel(self) {
        self.control.stop();
        if let Err(e) = self.task.await {
            tracing::error!("[{}] Transfer task failed: {}", self.id.short(), e);
        }
        remove_partial(&self.path).await;
    }
}

/// Starts single-file transfers
#[derive(Debug, Clone)]
pub struct DownloadEngine {
    client: Client,
    settings: Arc<EngineSettings>,
}

impl DownloadEngine {
    pub fn new(client: Client, settings: EngineSettings) -> Self {
        Self {
            client,
            settings: Arc::new(settings),
        }
    }

    /// Path a transfer for `name` from `url` is written to
    pub fn destination(&self, name: &str, url: &str) -> PathBuf {
        self.settings.download_dir.join(output_file_name(
            name,
            url,
            &self.settings.default_extension,
        ))
    }

    /// Start a transfer on a new task.
    ///
    /// Emits zero or more `Progress` events followed by exactly one
    /// `Completed` or `Failed` event on `events`.
    pub fn start(
        &self,
        request: TransferRequest,
        events: mpsc::UnboundedSender<EngineNotification>,
    ) -> EngineHandle {
        let id = request.id;
        let control = Arc::new(TransferControl::default());
        let path = self.destination(&request.name, &request.url);

        let transfer = Transfer {
            client: self.client.clone(),
            settings: self.settings.clone(),
            request,
            path: path.clone(),
            control: control.clone(),
            events,
        };
        let task = tokio::spawn(transfer.run());

        EngineHandle {
            id,
            control,
            path,
            task,
        }
    }
}

/// State owned by one transfer task
struct Transfer {
    client: Client,
    settings: Arc<EngineSettings>,
    request: TransferRequest,
    path: PathBuf,
    control: Arc<TransferControl>,
    events: mpsc::UnboundedSender<EngineNotification>,
}

impl Transfer {
    async fn run(self) {
        let id = self.request.id;
        let event = match self.download().await {
            Ok(summary) => {
                tracing::info!(
                    "[{}] Download completed: {:?} ({} bytes in {:.1}s)",
                    id.short(),
                    summary.path,
                    summary.total_bytes,
                    summary.elapsed.as_secs_f64()
                );
                EngineEvent::Completed(summary)
            }
            Err(Error::Cancelled) => {
                tracing::info!("[{}] Download stopped", id.short());
                EngineEvent::Failed(Error::Cancelled)
            }
            Err(e) => {
                tracing::warn!("[{}] Download failed: {}", id.short(), e);
                EngineEvent::Failed(e)
            }
        };
        self.emit(event);
    }

    fn emit(&self, event: EngineEvent) {
        // The receiver only disappears during shutdown
        let _ = self.events.send(EngineNotification {
            id: self.request.id,
            event,
        });
    }

    async fn download(&self) -> Result<TransferSummary> {
        let started = Instant::now();
        tracing::debug!(
            "[{}] Requesting {} for {:?}",
            self.request.id.short(),
            self.request.url,
            self.request.name
        );

        let response = tokio::select! {
            response = self.client.get(&self.request.url).send() => response?,
            _ = self.control.cancel.cancelled() => return Err(Error::Cancelled),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(
                NetworkErrorKind::HttpStatus(status.as_u16()),
                format!("HTTP error: {}", status),
            ));
        }

        let total_bytes = response
            .content_length()
            .filter(|len| *len > 0)
            .ok_or(Error::SizeUnknown)?;

        let dir = &self.settings.download_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::io(dir, e))?;

        let mut file = File::create(&self.path)
            .await
            .map_err(|e| Error::io(&self.path, e))?;
        tracing::debug!(
            "[{}] Writing {} bytes to {:?}",
            self.request.id.short(),
            total_bytes,
            self.path
        );

        let mut stream = Box::pin(response.bytes_stream());
        let result = self.stream_to_file(&mut stream, &mut file, total_bytes).await;
        drop(file);

        match result {
            // A stop that lands after the last chunk still discards the file
            Ok(_) if self.control.is_stopped() => {
                remove_partial(&self.path).await;
                Err(Error::Cancelled)
            }
            Ok(written) => Ok(TransferSummary {
                path: self.path.clone(),
                total_bytes: written,
                elapsed: started.elapsed(),
            }),
            Err(Error::Cancelled) => {
                remove_partial(&self.path).await;
                Err(Error::Cancelled)
            }
            // Partial file kept for inspection
            Err(e) => Err(e),
        }
    }

    /// Copy the body into `file`, returning the number of bytes written
    async fn stream_to_file<S>(&self, stream: &mut S, file: &mut File, total_bytes: u64) -> Result<u64>
    where
        S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
    {
        let chunk_size = self.settings.chunk_size;
        let mut buffer = BytesMut::with_capacity(chunk_size);
        let mut speed = SpeedCalculator::new(SPEED_WINDOW, SPEED_SAMPLE_INTERVAL);
        let mut downloaded: u64 = 0;
        let mut last_percent = None;

        loop {
            if self.control.is_paused() {
                tracing::debug!("[{}] Paused", self.request.id.short());
                if !self.control.wait_while_paused().await {
                    return Err(Error::Cancelled);
                }
                tracing::debug!("[{}] Resumed", self.request.id.short());
                speed.restart_period();
            }

            if self.control.is_stopped() {
                return Err(Error::Cancelled);
            }

            let chunk = match next_chunk(stream, &mut buffer, chunk_size, &self.control.cancel).await? {
                Some(chunk) => chunk,
                None => break,
            };
            let chunk_len = chunk.len();

            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io(&self.path, e))?;
            downloaded += chunk_len as u64;

            let sampled = speed.add_bytes(chunk_len as u64).is_some();
            let progress = TaskProgress::new(downloaded, total_bytes, speed.speed_kbs());
            if sampled || last_percent != Some(progress.percent) {
                last_percent = Some(progress.percent);
                self.emit(EngineEvent::Progress(progress));
            }

            if let Some(limit) = self.request.limit_kbs {
                let delay = pacing_delay(chunk_len, limit);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.control.cancel.cancelled() => return Err(Error::Cancelled),
                }
            }
        }

        file.flush().await.map_err(|e| Error::io(&self.path, e))?;
        file.sync_all().await.map_err(|e| Error::io(&self.path, e))?;

        if downloaded < total_bytes {
            return Err(Error::network(
                NetworkErrorKind::Other,
                format!(
                    "Incomplete download: received {} bytes, expected {} bytes",
                    downloaded, total_bytes
                ),
            ));
        }

        Ok(downloaded)
    }
}

/// Fill `buffer` up to `chunk_size` and split one chunk off it.
///
/// Returns `None` once the stream is exhausted and the buffer drained.
async fn next_chunk<S>(
    stream: &mut S,
    buffer: &mut BytesMut,
    chunk_size: usize,
    cancel: &CancellationToken,
) -> Result<Option<Bytes>>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    while buffer.len() < chunk_size {
        let next = tokio::select! {
            next = stream.next() => next,
            _ = cancel.cancelled() => return Err(Error::Cancelled),
        };
        match next {
            Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
            Some(Err(e)) => {
                return Err(Error::network(
                    NetworkErrorKind::Other,
                    format!("Stream error: {}", e),
                ))
            }
            None => break,
        }
    }

    if buffer.is_empty() {
        return Ok(None);
    }
    let take = buffer.len().min(chunk_size);
    Ok(Some(buffer.split_to(take).freeze()))
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed partial file {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove partial file {:?}: {}", path, e),
    }
}
