//! # Download Manager
//!
//! Orchestrates the offline download lifecycle: accepts requests, serializes
//! transfer work per content id, drives the record state machine, and keeps
//! the download record store consistent while background workers stream bytes.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │            DownloadManager             │
//! │  request_download / pause / resume     │
//! │  retry / cancel / remove               │
//! └──────┬──────────┬──────────┬───────────┘
//!        │          │          │
//!        │          │          └──> MediaTransport  (byte streams)
//!        │          └─────────────> DownloadStore   (durable records)
//!        └────────────────────────> ContentRepository (catalog metadata)
//! ```
//!
//! ## Concurrency
//!
//! - A bounded semaphore caps concurrent transfers; excess requests keep
//!   their record in `Queued` until a slot frees (backpressure, not failure).
//! - At most one transfer worker exists per content id, enforced through the
//!   `active` map: it is consulted and updated under one critical section
//!   before any worker is spawned, and workers take the same lock for their
//!   terminal record write, so per-id transitions are strictly ordered.
//! - `cancel` trips the worker's cancellation token, waits a bounded grace
//!   period, removes partial files, and only then deletes the record.
//!
//! ## Failure semantics
//!
//! Transfer errors (network, storage full, permission) never cross this
//! boundary as errors: they are captured into the record as `Failed` with
//! `last_error` set, and retry is an explicit caller action. Command misuse
//! (e.g. resuming a record that is not paused) does return an error.

use crate::config::DownloadConfig;
use crate::error::{DownloadError, Result};
use crate::record::{DownloadRecord, DownloadStatus};
use crate::store::{DownloadStore, DownloadsStream};
use crate::transport::MediaTransport;
use core_catalog::{ContentId, ContentKind, ContentRepository};
use core_runtime::events::{CoreEvent, DownloadEvent, EventBus};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Extension used for in-flight temp files inside the download directory.
const TEMP_EXTENSION: &str = "part";

/// How long `cancel` waits for a worker to acknowledge before aborting it.
const CANCEL_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Handles for one in-flight transfer worker.
struct ActiveTransfer {
    cancel: CancellationToken,
    pause: CancellationToken,
    handle: JoinHandle<()>,
}

/// How a transfer worker ended.
enum TransferOutcome {
    Completed(PathBuf),
    Paused,
    Failed(String),
    Cancelled,
}

/// Orchestrator for offline downloads.
///
/// The manager exclusively owns the download directory and is the only writer
/// of the download record store; UI code mutates download state solely
/// through its methods and observes results via [`observe_downloads`].
///
/// [`observe_downloads`]: DownloadManager::observe_downloads
pub struct DownloadManager {
    config: DownloadConfig,
    store: Arc<dyn DownloadStore>,
    catalog: ContentRepository,
    transport: Arc<dyn MediaTransport>,
    event_bus: Option<Arc<EventBus>>,
    transfer_slots: Arc<Semaphore>,
    active: Arc<Mutex<HashMap<ContentId, ActiveTransfer>>>,
    download_dir: Arc<Mutex<Option<PathBuf>>>,
}

impl DownloadManager {
    /// Create a new download manager.
    ///
    /// The scheduler (semaphore and worker spawning) is owned by this
    /// instance rather than being process-global, so tests can construct
    /// managers with deterministic transports and their own directories.
    pub fn new(
        config: DownloadConfig,
        store: Arc<dyn DownloadStore>,
        catalog: ContentRepository,
        transport: Arc<dyn MediaTransport>,
    ) -> Self {
        let transfer_slots = Arc::new(Semaphore::new(config.max_concurrent_transfers));

        Self {
            config,
            store,
            catalog,
            transport,
            event_bus: None,
            transfer_slots,
            active: Arc::new(Mutex::new(HashMap::new())),
            download_dir: Arc::new(Mutex::new(None)),
        }
    }

    /// Attach an event bus for lifecycle events.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Initialize the manager: validate configuration, create the download
    /// directory, initialize the store, and reconcile records left over from
    /// a previous process.
    ///
    /// Any record still marked `downloading` is downgraded to `failed` with
    /// `last_error = "interrupted"` before any new request is served; its
    /// partial temp file is kept so an explicit retry can resume. Records
    /// left in `queued` re-enter the transfer queue.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        info!("Initializing download manager");

        self.config
            .validate()
            .map_err(DownloadError::Config)?;

        tokio::fs::create_dir_all(&self.config.download_dir)
            .await
            .map_err(|e| DownloadError::storage("create download directory", e))?;

        self.store.initialize().await?;

        let interrupted = self.store.recover_interrupted().await?;
        if !interrupted.is_empty() {
            info!(
                count = interrupted.len(),
                "Reconciled interrupted downloads from previous run"
            );
        }

        *self.download_dir.lock().await = Some(self.config.download_dir.clone());

        // Queued records from a previous run still owe the user a transfer
        let queued = self.store.find_by_status(DownloadStatus::Queued).await?;
        if !queued.is_empty() {
            let mut active = self.active.lock().await;
            for record in queued {
                if !active.contains_key(&record.content_id) {
                    debug!(content_id = %record.content_id, "Re-entering queued download");
                    self.spawn_transfer_locked(&mut active, &record);
                }
            }
        }

        info!(download_dir = %self.config.download_dir.display(), "Download manager initialized");
        Ok(())
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Request an offline download for a content item.
    ///
    /// - No record yet: catalog metadata is fetched and a `Queued` record
    ///   created.
    /// - Existing `Failed` or `Paused` record: it transitions back to
    ///   `Queued`; no duplicate is ever created.
    /// - Existing `Queued`, `Downloading` or `Completed` record: no-op that
    ///   returns the current record.
    #[instrument(skip(self), fields(content_id = %content_id))]
    pub async fn request_download(&self, content_id: &ContentId) -> Result<DownloadRecord> {
        self.download_dir().await?;

        // Fast path: a worker already owns this id
        {
            let active = self.active.lock().await;
            if active.contains_key(content_id) {
                drop(active);
                return self.get_record(content_id).await;
            }
        }

        // Resolve catalog metadata outside the critical section; the fetch
        // can take a network round trip
        let fresh = match self.store.find_by_content_id(content_id).await? {
            Some(_) => None,
            None => {
                let item = self.catalog.get_content_by_id(content_id).await?;
                Some(DownloadRecord::new(&item))
            }
        };

        let mut active = self.active.lock().await;

        // Re-check under the lock: a concurrent request may have won
        if active.contains_key(content_id) {
            drop(active);
            return self.get_record(content_id).await;
        }

        let mut record = match self.store.find_by_content_id(content_id).await? {
            Some(existing) => existing,
            None => fresh.ok_or_else(|| DownloadError::NotFound(content_id.to_string()))?,
        };

        match record.status {
            DownloadStatus::Completed => return Ok(record),
            // A record claiming to be mid-transfer without a worker would be
            // a crash artifact; restart reconciliation prevents it, so treat
            // it as the no-op the caller asked for
            DownloadStatus::Downloading => return Ok(record),
            DownloadStatus::Paused | DownloadStatus::Failed => record.requeue()?,
            DownloadStatus::Queued => {}
        }

        self.store.upsert(&record).await?;
        self.spawn_transfer_locked(&mut active, &record);
        drop(active);

        self.emit(DownloadEvent::Queued {
            content_id: record.content_id.to_string(),
            title: record.title.clone(),
        });

        info!(content_id = %record.content_id, "Download queued");
        Ok(record)
    }

    /// Pause an in-flight transfer, retaining the bytes already on disk.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` unless the record is `Downloading`.
    #[instrument(skip(self), fields(content_id = %content_id))]
    pub async fn pause(&self, content_id: &ContentId) -> Result<()> {
        self.download_dir().await?;

        let active = self.active.lock().await;
        let record = self
            .store
            .find_by_content_id(content_id)
            .await?
            .ok_or_else(|| DownloadError::NotFound(content_id.to_string()))?;

        if record.status != DownloadStatus::Downloading {
            return Err(DownloadError::InvalidStateTransition {
                from: record.status.to_string(),
                to: DownloadStatus::Paused.to_string(),
                reason: "Only an in-flight transfer can be paused".to_string(),
            });
        }

        match active.get(content_id) {
            Some(entry) => {
                entry.pause.cancel();
                Ok(())
            }
            None => Err(DownloadError::InvalidStateTransition {
                from: record.status.to_string(),
                to: DownloadStatus::Paused.to_string(),
                reason: "Transfer is no longer in flight".to_string(),
            }),
        }
    }

    /// Resume a paused download. Partial bytes are reused when the remote
    /// honors byte ranges; otherwise the transfer restarts from zero.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` unless the record is `Paused`.
    #[instrument(skip(self), fields(content_id = %content_id))]
    pub async fn resume(&self, content_id: &ContentId) -> Result<DownloadRecord> {
        let record = self.requeue_from(content_id, DownloadStatus::Paused).await?;
        self.emit(DownloadEvent::Resumed {
            content_id: content_id.to_string(),
        });
        Ok(record)
    }

    /// Retry a failed download. The failure reason is cleared and the record
    /// re-enters the queue.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` unless the record is `Failed`.
    #[instrument(skip(self), fields(content_id = %content_id))]
    pub async fn retry(&self, content_id: &ContentId) -> Result<DownloadRecord> {
        let record = self.requeue_from(content_id, DownloadStatus::Failed).await?;
        self.emit(DownloadEvent::Queued {
            content_id: record.content_id.to_string(),
            title: record.title.clone(),
        });
        Ok(record)
    }

    /// Cancel a download in any state: interrupt the worker promptly, remove
    /// partial and final files, then delete the record. Cancelling an unknown
    /// id is a no-op.
    #[instrument(skip(self), fields(content_id = %content_id))]
    pub async fn cancel(&self, content_id: &ContentId) -> Result<()> {
        let dir = self.download_dir().await?;

        let entry = self.active.lock().await.remove(content_id);
        if let Some(entry) = entry {
            entry.cancel.cancel();

            let mut handle = entry.handle;
            if tokio::time::timeout(CANCEL_GRACE_PERIOD, &mut handle)
                .await
                .is_err()
            {
                warn!(content_id = %content_id, "Transfer worker did not stop in time; aborting");
                handle.abort();
                let _ = handle.await;
            }
        }

        let record = self.store.find_by_content_id(content_id).await?;

        // Partial (and any final) file goes away before the record does, so
        // a crash between the two steps cannot orphan a file without a record
        remove_file_if_exists(&temp_path(&dir, content_id)).await;
        if let Some(record) = &record {
            if let Some(path) = &record.local_path {
                remove_file_if_exists(Path::new(path)).await;
            }
        }

        if record.is_some() {
            self.store.delete(content_id).await?;
            self.emit(DownloadEvent::Cancelled {
                content_id: content_id.to_string(),
            });
            info!(content_id = %content_id, "Download cancelled");
        }

        Ok(())
    }

    /// Remove a completed download: unlink the local file, then delete the
    /// record.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` unless the record is `Completed`;
    /// use [`cancel`](DownloadManager::cancel) for anything still in flight.
    #[instrument(skip(self), fields(content_id = %content_id))]
    pub async fn remove(&self, content_id: &ContentId) -> Result<()> {
        self.download_dir().await?;

        let record = self
            .store
            .find_by_content_id(content_id)
            .await?
            .ok_or_else(|| DownloadError::NotFound(content_id.to_string()))?;

        if record.status != DownloadStatus::Completed {
            return Err(DownloadError::InvalidStateTransition {
                from: record.status.to_string(),
                to: "removed".to_string(),
                reason: "Only completed downloads can be removed; cancel instead".to_string(),
            });
        }

        if let Some(path) = &record.local_path {
            remove_file_if_exists(Path::new(path)).await;
        }

        self.store.delete(content_id).await?;
        self.emit(DownloadEvent::Removed {
            content_id: content_id.to_string(),
        });

        info!(content_id = %content_id, "Download removed");
        Ok(())
    }

    // ========================================================================
    // Read view
    // ========================================================================

    /// Fetch the current record for a content id.
    pub async fn get_record(&self, content_id: &ContentId) -> Result<DownloadRecord> {
        self.store
            .find_by_content_id(content_id)
            .await?
            .ok_or_else(|| DownloadError::NotFound(content_id.to_string()))
    }

    /// Check whether a content item is downloaded and available offline.
    pub async fn is_downloaded(&self, content_id: &ContentId) -> Result<bool> {
        Ok(self
            .store
            .find_by_content_id(content_id)
            .await?
            .map(|record| record.status.is_available())
            .unwrap_or(false))
    }

    /// All download records, ordered by creation time.
    pub async fn list_downloads(&self) -> Result<Vec<DownloadRecord>> {
        self.store.list_all().await
    }

    /// Observe the downloads list: the full current snapshot immediately,
    /// then a fresh snapshot after every record mutation. Observers never
    /// block transfer workers or store writers.
    pub async fn observe_downloads(&self) -> Result<DownloadsStream> {
        self.store.observe().await
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn download_dir(&self) -> Result<PathBuf> {
        self.download_dir
            .lock()
            .await
            .clone()
            .ok_or(DownloadError::NotInitialized)
    }

    /// Shared requeue path for `resume` and `retry`.
    async fn requeue_from(
        &self,
        content_id: &ContentId,
        expected: DownloadStatus,
    ) -> Result<DownloadRecord> {
        self.download_dir().await?;

        let mut active = self.active.lock().await;

        let mut record = self
            .store
            .find_by_content_id(content_id)
            .await?
            .ok_or_else(|| DownloadError::NotFound(content_id.to_string()))?;

        if record.status != expected {
            return Err(DownloadError::InvalidStateTransition {
                from: record.status.to_string(),
                to: DownloadStatus::Queued.to_string(),
                reason: format!("Record must be {} to re-enter the queue", expected),
            });
        }

        record.requeue()?;
        self.store.upsert(&record).await?;
        self.spawn_transfer_locked(&mut active, &record);

        Ok(record)
    }

    /// Spawn a transfer worker for `record`. The caller holds the `active`
    /// lock, which is what makes the single-flight check-and-insert atomic.
    fn spawn_transfer_locked(
        &self,
        active: &mut HashMap<ContentId, ActiveTransfer>,
        record: &DownloadRecord,
    ) {
        let cancel = CancellationToken::new();
        let pause = CancellationToken::new();

        let manager = self.clone_for_task();
        let worker_record = record.clone();
        let worker_cancel = cancel.clone();
        let worker_pause = pause.clone();

        let handle = tokio::spawn(async move {
            manager
                .run_transfer(worker_record, worker_cancel, worker_pause)
                .await;
        });

        active.insert(
            record.content_id.clone(),
            ActiveTransfer {
                cancel,
                pause,
                handle,
            },
        );
    }

    /// Clone for background task (avoids Arc<Arc<...>>)
    fn clone_for_task(&self) -> Self {
        Self {
            config: self.config.clone(),
            store: Arc::clone(&self.store),
            catalog: self.catalog.clone(),
            transport: Arc::clone(&self.transport),
            event_bus: self.event_bus.clone(),
            transfer_slots: Arc::clone(&self.transfer_slots),
            active: Arc::clone(&self.active),
            download_dir: Arc::clone(&self.download_dir),
        }
    }

    /// Transfer worker body: wait for a slot, stream bytes, finish with a
    /// terminal record write.
    #[instrument(skip(self, record, cancel, pause), fields(content_id = %record.content_id))]
    async fn run_transfer(
        &self,
        mut record: DownloadRecord,
        cancel: CancellationToken,
        pause: CancellationToken,
    ) {
        let content_id = record.content_id.clone();

        // Backpressure: the record stays Queued until a slot frees
        let permit = tokio::select! {
            _ = cancel.cancelled() => {
                self.cleanup_cancelled(&content_id).await;
                return;
            }
            permit = Arc::clone(&self.transfer_slots).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    self.finish_failed(record, "transfer scheduler shut down").await;
                    return;
                }
            }
        };

        let outcome = tokio::select! {
            _ = cancel.cancelled() => TransferOutcome::Cancelled,
            result = tokio::time::timeout(
                self.config.transfer_timeout,
                self.execute_transfer(&mut record, &pause),
            ) => match result {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => TransferOutcome::Failed(e.to_string()),
                Err(_) => TransferOutcome::Failed("transfer timed out".to_string()),
            }
        };

        drop(permit);

        match outcome {
            TransferOutcome::Completed(final_path) => {
                self.finish_completed(record, final_path).await;
            }
            TransferOutcome::Paused => self.finish_paused(record).await,
            TransferOutcome::Failed(reason) => self.finish_failed(record, &reason).await,
            TransferOutcome::Cancelled => self.cleanup_cancelled(&content_id).await,
        }
    }

    /// Stream the media into a temp file and promote it on success.
    async fn execute_transfer(
        &self,
        record: &mut DownloadRecord,
        pause: &CancellationToken,
    ) -> Result<TransferOutcome> {
        let dir = self.download_dir().await?;
        let temp = temp_path(&dir, &record.content_id);

        // Bytes actually on disk are the source of truth for the resume
        // offset; the persisted counter may be ahead of an unsynced file
        let offset = match tokio::fs::metadata(&temp).await {
            Ok(metadata) => metadata.len(),
            Err(_) => 0,
        };

        let stream = self.transport.open(&record.source_url, offset).await?;
        let resumed_from = stream.resumed_from;

        let mut file = if resumed_from == 0 {
            tokio::fs::File::create(&temp)
                .await
                .map_err(|e| DownloadError::storage("create temp file", e))?
        } else {
            tokio::fs::OpenOptions::new()
                .append(true)
                .open(&temp)
                .await
                .map_err(|e| DownloadError::storage("open temp file for resume", e))?
        };

        record.start(stream.total_bytes, resumed_from)?;
        self.store.upsert(record).await?;
        self.emit(DownloadEvent::Started {
            content_id: record.content_id.to_string(),
            total_bytes: record.total_bytes,
        });

        info!(
            content_id = %record.content_id,
            total_bytes = ?record.total_bytes,
            resumed_from,
            "Transfer started"
        );

        let mut body = stream.body;
        let mut unflushed: u64 = 0;

        loop {
            tokio::select! {
                _ = pause.cancelled() => {
                    file.flush()
                        .await
                        .map_err(|e| DownloadError::storage("flush temp file", e))?;
                    return Ok(TransferOutcome::Paused);
                }
                chunk = futures::StreamExt::next(&mut body) => match chunk {
                    Some(Ok(bytes)) => {
                        file.write_all(&bytes)
                            .await
                            .map_err(|e| DownloadError::storage("write media chunk", e))?;

                        let written = record.bytes_downloaded + bytes.len() as u64;
                        record.record_progress(written)?;

                        unflushed += bytes.len() as u64;
                        if unflushed >= self.config.progress_flush_bytes {
                            unflushed = 0;
                            self.store.upsert(record).await?;
                            self.emit(DownloadEvent::Progress {
                                content_id: record.content_id.to_string(),
                                bytes_downloaded: record.bytes_downloaded,
                                total_bytes: record.total_bytes,
                            });
                        }
                    }
                    Some(Err(e)) => return Err(e),
                    None => break,
                }
            }
        }

        file.flush()
            .await
            .map_err(|e| DownloadError::storage("flush temp file", e))?;
        file.sync_all()
            .await
            .map_err(|e| DownloadError::storage("sync temp file", e))?;
        drop(file);

        if let Some(total) = record.total_bytes {
            if record.bytes_downloaded < total {
                return Err(DownloadError::Transport(format!(
                    "transfer truncated at {} of {} bytes",
                    record.bytes_downloaded, total
                )));
            }
        }

        // Atomic promotion: the final path only ever holds a complete file
        let final_path = final_media_path(&dir, record);
        tokio::fs::rename(&temp, &final_path)
            .await
            .map_err(|e| DownloadError::storage("promote downloaded file", e))?;

        Ok(TransferOutcome::Completed(final_path))
    }

    /// Terminal write for a successful transfer. Holds the `active` lock so
    /// the record mutation and worker deregistration are one step from the
    /// point of view of the command methods.
    async fn finish_completed(&self, mut record: DownloadRecord, final_path: PathBuf) {
        let mut active = self.active.lock().await;

        let content_id = record.content_id.to_string();
        let local_path = final_path.display().to_string();

        match record.complete(local_path.clone()) {
            Ok(()) => {
                if let Err(e) = self.store.upsert(&record).await {
                    error!(content_id = %content_id, error = %e, "Failed to persist completed download");
                }
            }
            Err(e) => error!(content_id = %content_id, error = %e, "Invalid completion transition"),
        }

        active.remove(&record.content_id);
        drop(active);

        self.emit(DownloadEvent::Completed {
            content_id: content_id.clone(),
            local_path,
        });
        info!(content_id = %content_id, "Download completed");
    }

    /// Terminal write for a failed transfer.
    async fn finish_failed(&self, mut record: DownloadRecord, reason: &str) {
        let mut active = self.active.lock().await;

        let content_id = record.content_id.to_string();
        match record.fail(reason) {
            Ok(()) => {
                if let Err(e) = self.store.upsert(&record).await {
                    error!(content_id = %content_id, error = %e, "Failed to persist failed download");
                }
            }
            Err(e) => error!(content_id = %content_id, error = %e, "Invalid failure transition"),
        }

        active.remove(&record.content_id);
        drop(active);

        self.emit(DownloadEvent::Failed {
            content_id: content_id.clone(),
            error: reason.to_string(),
        });
        warn!(content_id = %content_id, reason, "Download failed");
    }

    /// Terminal write for a paused transfer. The temp file stays on disk for
    /// resume.
    async fn finish_paused(&self, mut record: DownloadRecord) {
        let mut active = self.active.lock().await;

        let content_id = record.content_id.to_string();
        match record.pause() {
            Ok(()) => {
                if let Err(e) = self.store.upsert(&record).await {
                    error!(content_id = %content_id, error = %e, "Failed to persist paused download");
                }
            }
            Err(e) => error!(content_id = %content_id, error = %e, "Invalid pause transition"),
        }

        active.remove(&record.content_id);
        drop(active);

        self.emit(DownloadEvent::Paused {
            content_id: content_id.clone(),
        });
        info!(content_id = %content_id, "Download paused");
    }

    /// Cancelled workers only clean their temp file; `cancel()` owns the
    /// record deletion and already removed this worker from the active map.
    async fn cleanup_cancelled(&self, content_id: &ContentId) {
        if let Ok(dir) = self.download_dir().await {
            remove_file_if_exists(&temp_path(&dir, content_id)).await;
        }
        debug!(content_id = %content_id, "Transfer worker acknowledged cancellation");
    }

    fn emit(&self, event: DownloadEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Download(event)).ok();
        }
    }
}

// ============================================================================
// Path helpers
// ============================================================================

fn temp_path(dir: &Path, content_id: &ContentId) -> PathBuf {
    dir.join(format!("{}.{}", content_id, TEMP_EXTENSION))
}

fn final_media_path(dir: &Path, record: &DownloadRecord) -> PathBuf {
    dir.join(format!("{}.{}", record.content_id, media_extension(record)))
}

/// File extension for the final media file: taken from the source URL when it
/// carries a plausible one, otherwise derived from the media kind.
fn media_extension(record: &DownloadRecord) -> String {
    let from_url = record
        .source_url
        .rsplit('/')
        .next()
        .and_then(|segment| segment.split(['?', '#']).next())
        .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext))
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        });

    match from_url {
        Some(ext) => ext.to_ascii_lowercase(),
        None => match record.kind {
            ContentKind::Video => "mp4".to_string(),
            ContentKind::Audio => "mp3".to_string(),
        },
    }
}

async fn remove_file_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}
