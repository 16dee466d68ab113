//! Download Manager - queue coordinator
//!
//! The `DownloadManager` is a cloneable handle to a single coordination
//! task. That task exclusively owns the FIFO, the active slot, the history
//! and the statistics; handles talk to it over a command channel and engine
//! workers report to it over an unbounded notification channel.
//!
//! At most one task is active at a time. When it reaches a terminal state
//! the head of the queue is dispatched.

use crate::config::ClientConfig;
use crate::engine::{
    DownloadEngine, EngineEvent, EngineHandle, EngineNotification, EngineSettings,
    TransferRequest, TransferSummary,
};
use crate::error::{Error, Result};
use crate::history::HistoryLog;
use crate::http::media_client;
use crate::protocol::{
    format_size, DownloadTask, HistoryRecord, ManagerEvent, ManagerSnapshot, Statistics, TaskId,
    TaskStatus,
};
use crate::queue::TaskQueue;
use crate::storage::ConfigStore;
use chrono::Utc;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

/// Maximum number of events to buffer
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Maximum number of pending commands
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Requests handled by the coordination task
enum Command {
    Enqueue {
        name: String,
        url: String,
        limit_kbs: Option<u64>,
        reply: oneshot::Sender<TaskId>,
    },
    Cancel {
        name: String,
        reply: oneshot::Sender<bool>,
    },
    Pause {
        name: String,
        reply: oneshot::Sender<bool>,
    },
    Resume {
        name: String,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<ManagerSnapshot>,
    },
    History {
        reply: oneshot::Sender<Vec<HistoryRecord>>,
    },
    Stats {
        reply: oneshot::Sender<Statistics>,
    },
    SetBandwidthLimit {
        kbs: u64,
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to the download manager
#[derive(Clone)]
pub struct DownloadManager {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<ManagerEvent>,
    download_dir: PathBuf,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl DownloadManager {
    /// Start a manager from `config`, persisting statistics through `store`.
    ///
    /// Must be called inside a tokio runtime.
    pub async fn new(config: ClientConfig, store: Arc<dyn ConfigStore>) -> Result<Self> {
        config.validate()?;

        let download_dir = config.resolve_download_dir().await;
        tracing::info!("Downloads will be saved to {:?}", download_dir);

        let client = media_client(&config.http)?;
        let engine = DownloadEngine::new(
            client,
            EngineSettings::new(download_dir.clone(), &config.http),
        );

        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let coordinator = Coordinator {
            engine,
            store,
            default_limit_kbs: config.bandwidth_limit_option(),
            stats: config.stats.clone(),
            config,
            queue: TaskQueue::new(),
            history: HistoryLog::new(),
            active: None,
            events: events.clone(),
            notify_tx,
        };
        let task = tokio::spawn(coordinator.run(commands_rx, notify_rx));

        Ok(Self {
            commands: commands_tx,
            events,
            download_dir,
            task: Arc::new(Mutex::new(Some(task))),
        })
    }

    /// Load the configuration from `store` and start a manager with it
    pub async fn load(store: Arc<dyn ConfigStore>) -> Result<Self> {
        let config = store.load().await?;
        Self::new(config, store).await
    }

    /// Directory downloads are written to
    pub fn download_dir(&self) -> &std::path::Path {
        &self.download_dir
    }

    /// Subscribe to manager events
    pub fn subscribe(&self) -> broadcast::Receiver<ManagerEvent> {
        self.events.subscribe()
    }

    /// Append a download to the queue and start it if nothing is active.
    ///
    /// `limit_kbs` of `None` uses the current default limit; `Some(0)`
    /// means unlimited.
    pub async fn enqueue(
        &self,
        name: impl Into<String>,
        url: impl Into<String>,
        limit_kbs: Option<u64>,
    ) -> Result<TaskId> {
        let name = name.into();
        let url = url.into();

        if name.trim().is_empty() {
            return Err(Error::invalid_input("name", "Name cannot be empty"));
        }
        let parsed = url::Url::parse(&url)
            .map_err(|e| Error::invalid_input("url", format!("Invalid URL: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::invalid_input(
                "url",
                format!("Unsupported scheme: {}", parsed.scheme()),
            ));
        }

        self.request(|reply| Command::Enqueue {
            name,
            url,
            limit_kbs,
            reply,
        })
        .await
    }

    /// Cancel an active or queued task. Returns `false` for unknown names.
    pub async fn cancel(&self, name: impl Into<String>) -> Result<bool> {
        let name = name.into();
        self.request(|reply| Command::Cancel { name, reply }).await
    }

    /// Pause the active task if it is called `name`
    pub async fn pause(&self, name: impl Into<String>) -> Result<bool> {
        let name = name.into();
        self.request(|reply| Command::Pause { name, reply }).await
    }

    /// Resume the active task if it is called `name` and paused
    pub async fn resume(&self, name: impl Into<String>) -> Result<bool> {
        let name = name.into();
        self.request(|reply| Command::Resume { name, reply }).await
    }

    pub async fn snapshot(&self) -> Result<ManagerSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// History records, most recent first
    pub async fn history(&self) -> Result<Vec<HistoryRecord>> {
        self.request(|reply| Command::History { reply }).await
    }

    pub async fn stats(&self) -> Result<Statistics> {
        self.request(|reply| Command::Stats { reply }).await
    }

    /// Set the default limit for later enqueues (0 = unlimited)
    pub async fn set_bandwidth_limit(&self, kbs: u64) -> Result<()> {
        self.request(|reply| Command::SetBandwidthLimit { kbs, reply })
            .await
    }

    /// Stop the active transfer and the coordination task
    pub async fn shutdown(&self) -> Result<()> {
        let result = self.request(|reply| Command::Shutdown { reply }).await;

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!("Download manager task failed: {}", e);
            }
        }

        match result {
            // Already stopped by another handle
            Err(Error::Shutdown) => Ok(()),
            other => other,
        }
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| Error::Shutdown)?;
        rx.await.map_err(|_| Error::Shutdown)
    }
}

/// The task holding the active slot
struct ActiveTransfer {
    task: DownloadTask,
    handle: EngineHandle,
}

/// State owned by the coordination task
struct Coordinator {
    engine: DownloadEngine,
    store: Arc<dyn ConfigStore>,
    /// Configuration the manager was started with
    config: ClientConfig,
    default_limit_kbs: Option<u64>,
    stats: Statistics,
    queue: TaskQueue,
    history: HistoryLog,
    active: Option<ActiveTransfer>,
    events: broadcast::Sender<ManagerEvent>,
    notify_tx: mpsc::UnboundedSender<EngineNotification>,
}

impl Coordinator {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut notifications: mpsc::UnboundedReceiver<EngineNotification>,
    ) {
        tracing::debug!("Download manager started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command).await {
                            break;
                        }
                    }
                    None => {
                        // Every handle was dropped
                        self.shutdown().await;
                        break;
                    }
                },
                Some(notification) = notifications.recv() => {
                    self.handle_notification(notification).await;
                }
            }
        }
        tracing::debug!("Download manager stopped");
    }

    /// Returns `false` once the coordinator should stop
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Enqueue {
                name,
                url,
                limit_kbs,
                reply,
            } => {
                let id = self.enqueue(name, url, limit_kbs);
                let _ = reply.send(id);
            }
            Command::Cancel { name, reply } => {
                let cancelled = self.cancel(&name).await;
                let _ = reply.send(cancelled);
            }
            Command::Pause { name, reply } => {
                let _ = reply.send(self.pause(&name));
            }
            Command::Resume { name, reply } => {
                let _ = reply.send(self.resume(&name));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::History { reply } => {
                let _ = reply.send(self.history.entries());
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.stats.clone());
            }
            Command::SetBandwidthLimit { kbs, reply } => {
                self.default_limit_kbs = Some(kbs).filter(|l| *l > 0);
                tracing::info!("Default bandwidth limit set to {} KB/s", kbs);
                let _ = reply.send(());
            }
            Command::Shutdown { reply } => {
                self.shutdown().await;
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    fn emit(&self, event: ManagerEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn enqueue(&mut self, name: String, url: String, limit_kbs: Option<u64>) -> TaskId {
        let limit = limit_kbs.or(self.default_limit_kbs);
        let task = DownloadTask::new(name, url, limit);
        let id = task.id;

        tracing::info!("[{}] Queued download: {}", id.short(), task.name);
        self.history.record(&task.name, TaskStatus::Queued.label());
        self.emit(ManagerEvent::Queued {
            name: task.name.clone(),
        });
        self.queue.push(task);

        self.dispatch();
        self.emit(ManagerEvent::QueueUpdated);
        id
    }

    /// Start the head of the queue if the slot is free
    fn dispatch(&mut self) {
        if self.active.is_some() {
            return;
        }
        let Some(mut task) = self.queue.pop() else {
            return;
        };

        task.status = TaskStatus::Active;
        task.started_at = Some(Utc::now());
        tracing::info!(
            "[{}] Starting download: {} ({} waiting)",
            task.id.short(),
            task.name,
            self.queue.len()
        );

        let handle = self
            .engine
            .start(TransferRequest::from(&task), self.notify_tx.clone());
        self.history.record(&task.name, TaskStatus::Active.label());
        self.emit(ManagerEvent::Started {
            name: task.name.clone(),
        });
        self.active = Some(ActiveTransfer { task, handle });
    }

    async fn handle_notification(&mut self, notification: EngineNotification) {
        let is_current = self
            .active
            .as_ref()
            .is_some_and(|active| active.task.id == notification.id);
        if !is_current {
            tracing::debug!(
                "[{}] Ignoring notification from a finished transfer",
                notification.id.short()
            );
            return;
        }

        match notification.event {
            EngineEvent::Progress(progress) => {
                if let Some(active) = self.active.as_mut() {
                    active.task.apply_progress(&progress);
                    let name = active.task.name.clone();
                    self.emit(ManagerEvent::Progress { name, progress });
                }
            }
            EngineEvent::Completed(summary) => self.on_completed(summary).await,
            EngineEvent::Failed(error) => self.on_failed(error).await,
        }
    }

    /// Release the active slot, waiting for the worker to exit.
    ///
    /// `Cancelled` also stops the worker and discards its output.
    async fn finish_active(&mut self, status: TaskStatus) -> Option<DownloadTask> {
        debug_assert!(status.is_terminal());
        let active = self.active.take()?;
        if status == TaskStatus::Cancelled {
            active.handle.cancel().await;
        } else {
            active.handle.join().await;
        }

        let mut task = active.task;
        task.status = status;
        task.finished_at = Some(Utc::now());
        tracing::debug!("[{}] {} is now {}", task.id.short(), task.name, task.status);
        Some(task)
    }

    async fn on_completed(&mut self, summary: TransferSummary) {
        let Some(task) = self.finish_active(TaskStatus::Completed).await else {
            return;
        };

        self.stats
            .record_download(summary.total_bytes, summary.elapsed);
        self.persist_stats().await;

        self.history.record(
            &task.name,
            format!("Completed - {}", format_size(summary.total_bytes)),
        );
        self.emit(ManagerEvent::Completed {
            name: task.name,
            total_bytes: summary.total_bytes,
        });

        self.dispatch();
        self.emit(ManagerEvent::QueueUpdated);
    }

    async fn on_failed(&mut self, error: Error) {
        let Some(task) = self.finish_active(TaskStatus::Failed).await else {
            return;
        };

        tracing::warn!("[{}] {} failed: {}", task.id.short(), task.name, error);
        self.history
            .record(&task.name, format!("Error: {}", error));
        self.emit(ManagerEvent::Failed {
            name: task.name,
            error: error.to_string(),
        });

        self.dispatch();
        self.emit(ManagerEvent::QueueUpdated);
    }

    async fn cancel(&mut self, name: &str) -> bool {
        let is_active = self
            .active
            .as_ref()
            .is_some_and(|active| active.task.name == name);

        if is_active {
            if let Some(task) = self.finish_active(TaskStatus::Cancelled).await {
                tracing::info!("[{}] Cancelled active download: {}", task.id.short(), name);
                self.history.record(name, task.status.label());
            }
            self.emit(ManagerEvent::Cancelled {
                name: name.to_string(),
            });
            self.dispatch();
            self.emit(ManagerEvent::QueueUpdated);
            return true;
        }

        if let Some(mut task) = self.queue.remove_by_name(name) {
            task.status = TaskStatus::Cancelled;
            tracing::info!("[{}] Removed queued download: {}", task.id.short(), name);
            self.history.record(name, task.status.label());
            self.emit(ManagerEvent::Cancelled {
                name: name.to_string(),
            });
            self.emit(ManagerEvent::QueueUpdated);
            return true;
        }

        tracing::debug!("Cancel requested for unknown download: {}", name);
        false
    }

    fn pause(&mut self, name: &str) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if active.task.name != name || active.task.status != TaskStatus::Active {
            return false;
        }

        active.handle.pause();
        active.task.status = TaskStatus::Paused;
        tracing::info!("[{}] Paused: {}", active.task.id.short(), name);

        self.history.record(name, TaskStatus::Paused.label());
        self.emit(ManagerEvent::Paused {
            name: name.to_string(),
        });
        true
    }

    fn resume(&mut self, name: &str) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if active.task.name != name || active.task.status != TaskStatus::Paused {
            return false;
        }

        active.handle.resume();
        active.task.status = TaskStatus::Active;
        tracing::info!("[{}] Resumed: {}", active.task.id.short(), name);

        self.history.record(name, TaskStatus::Active.label());
        self.emit(ManagerEvent::Resumed {
            name: name.to_string(),
        });
        true
    }

    fn snapshot(&self) -> ManagerSnapshot {
        ManagerSnapshot {
            active: self.active.as_ref().map(|a| a.task.clone()),
            queued: self.queue.iter().cloned().collect(),
            history: self.history.entries(),
            stats: self.stats.clone(),
        }
    }

    /// Write the statistics into the stored record. Failures are logged only.
    async fn persist_stats(&mut self) {
        let mut record = match self.store.load().await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Failed to load configuration, using startup values: {}", e);
                self.config.clone()
            }
        };
        record.stats = self.stats.clone();

        match self.store.save(&record).await {
            Ok(()) => {
                tracing::debug!(
                    "Statistics saved: {} downloads, {} bytes",
                    self.stats.total_downloads,
                    self.stats.total_size_bytes
                );
                self.config = record;
            }
            Err(e) => tracing::warn!("Failed to save statistics: {}", e),
        }
    }

    async fn shutdown(&mut self) {
        if let Some(task) = self.finish_active(TaskStatus::Cancelled).await {
            tracing::info!("Stopped active download: {}", task.name);
        }

        for task in self.queue.drain() {
            tracing::debug!("[{}] Dropping queued download: {}", task.id.short(), task.name);
        }
    }
}
