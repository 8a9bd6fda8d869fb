//! # Download Record Store
//!
//! Durable keyed table of download records plus a live query.
//!
//! ## Overview
//!
//! The store owns the `downloads` table: one row per content id, surviving
//! process restarts. It offers:
//!
//! - **Keyed access**: `upsert`, `find_by_content_id`, `delete` (idempotent)
//! - **Live query**: `observe()` delivers the full current snapshot on
//!   subscribe and a fresh snapshot after every committed write
//! - **Restart reconciliation**: `recover_interrupted()` downgrades rows left
//!   in `downloading` to `failed`, since an interrupted transfer cannot be
//!   assumed to have continued
//!
//! ## Consistency
//!
//! `upsert` is a single `INSERT … ON CONFLICT DO UPDATE` statement, so
//! concurrent upserts for the same content id apply in some serial order and
//! a reader never sees a torn row. Snapshots are published over a broadcast
//! channel after the write commits; slow subscribers lag independently and
//! never block writers.

use crate::error::{DownloadError, Result};
use crate::record::{now_ms, DownloadRecord, DownloadStatus};
use async_trait::async_trait;
use core_catalog::{ContentId, ContentKind};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

/// Error message recorded for transfers interrupted by a process restart.
pub const INTERRUPTED_ERROR: &str = "interrupted";

/// Snapshot buffer size for the observation channel.
const SNAPSHOT_BUFFER_SIZE: usize = 16;

/// An observed sequence of download snapshots.
///
/// The first `recv()` yields the snapshot taken at subscription time; every
/// subsequent `recv()` yields the state after a store mutation. Snapshots are
/// complete, so a subscriber that lags and skips intermediate snapshots still
/// converges on the latest state.
pub struct DownloadsStream {
    initial: Option<Vec<DownloadRecord>>,
    receiver: broadcast::Receiver<Vec<DownloadRecord>>,
}

impl DownloadsStream {
    /// Receive the next snapshot.
    ///
    /// Returns `None` once the store has been dropped and all pending
    /// snapshots were consumed. A lagged subscriber skips to the most recent
    /// available snapshot rather than erroring.
    pub async fn recv(&mut self) -> Option<Vec<DownloadRecord>> {
        if let Some(snapshot) = self.initial.take() {
            return Some(snapshot);
        }

        loop {
            match self.receiver.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Downloads observer lagged; skipping to latest snapshot");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Repository trait for download record persistence.
#[async_trait]
pub trait DownloadStore: Send + Sync {
    /// Initialize the store (create tables if needed).
    async fn initialize(&self) -> Result<()>;

    /// Insert the record if its content id is absent, otherwise overwrite in
    /// place. `updated_at` is bumped by the store; `created_at` of an
    /// existing row is preserved.
    async fn upsert(&self, record: &DownloadRecord) -> Result<()>;

    /// Find a record by content id.
    async fn find_by_content_id(&self, content_id: &ContentId)
        -> Result<Option<DownloadRecord>>;

    /// All records with the given status.
    async fn find_by_status(&self, status: DownloadStatus) -> Result<Vec<DownloadRecord>>;

    /// Delete a record. Deleting an absent id is a no-op.
    async fn delete(&self, content_id: &ContentId) -> Result<()>;

    /// All records, ordered by creation time ascending (stable).
    async fn list_all(&self) -> Result<Vec<DownloadRecord>>;

    /// Downgrade rows left in `downloading` by a previous process to
    /// `failed` with [`INTERRUPTED_ERROR`]. Returns the affected records.
    async fn recover_interrupted(&self) -> Result<Vec<DownloadRecord>>;

    /// Observe the store: current snapshot now, a fresh snapshot after every
    /// write.
    async fn observe(&self) -> Result<DownloadsStream>;
}

/// SQLite implementation of the download record store.
pub struct SqliteDownloadStore {
    pool: SqlitePool,
    publisher: broadcast::Sender<Vec<DownloadRecord>>,
}

impl SqliteDownloadStore {
    /// Create a new store over the given pool. Call `initialize()` before
    /// first use.
    pub fn new(pool: SqlitePool) -> Self {
        let (publisher, _) = broadcast::channel(SNAPSHOT_BUFFER_SIZE);
        Self { pool, publisher }
    }

    /// Publish the current table state to all observers.
    ///
    /// Publish failures are not surfaced to writers: a missing audience is
    /// normal, and a query failure here must not fail the committed write.
    async fn publish_snapshot(&self) {
        match self.list_all().await {
            Ok(snapshot) => {
                self.publisher.send(snapshot).ok();
            }
            Err(e) => warn!(error = %e, "Failed to publish downloads snapshot"),
        }
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<DownloadRecord> {
        let content_id = ContentId::new(row.get::<String, _>("content_id"))
            .map_err(|e| DownloadError::Database(format!("Invalid content_id: {}", e)))?;

        let kind = ContentKind::from_str(&row.get::<String, _>("kind"))
            .map_err(|e| DownloadError::Database(format!("Invalid kind: {}", e)))?;

        Ok(DownloadRecord {
            content_id,
            title: row.get("title"),
            performer_name: row.get("performer_name"),
            thumbnail_url: row.get("thumbnail_url"),
            kind,
            duration_secs: row.get::<i64, _>("duration_secs") as u32,
            source_url: row.get("source_url"),
            status: row.get::<String, _>("status").parse()?,
            local_path: row.get("local_path"),
            bytes_downloaded: row.get::<i64, _>("bytes_downloaded") as u64,
            total_bytes: row
                .get::<Option<i64>, _>("total_bytes")
                .map(|total| total as u64),
            last_error: row.get("last_error"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl DownloadStore for SqliteDownloadStore {
    #[instrument(skip(self))]
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS downloads (
                content_id TEXT PRIMARY KEY NOT NULL,
                title TEXT NOT NULL,
                performer_name TEXT,
                thumbnail_url TEXT,
                kind TEXT NOT NULL,
                duration_secs INTEGER NOT NULL DEFAULT 0,
                source_url TEXT NOT NULL,
                status TEXT NOT NULL,
                local_path TEXT,
                bytes_downloaded INTEGER NOT NULL DEFAULT 0,
                total_bytes INTEGER,
                last_error TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DownloadError::Database(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_downloads_status ON downloads(status)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DownloadError::Database(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_downloads_created_at ON downloads(created_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DownloadError::Database(e.to_string()))?;

        debug!("Download store initialized");
        Ok(())
    }

    #[instrument(skip(self, record), fields(content_id = %record.content_id, status = %record.status))]
    async fn upsert(&self, record: &DownloadRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO downloads (
                content_id, title, performer_name, thumbnail_url, kind,
                duration_secs, source_url, status, local_path,
                bytes_downloaded, total_bytes, last_error, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(content_id) DO UPDATE SET
                title = excluded.title,
                performer_name = excluded.performer_name,
                thumbnail_url = excluded.thumbnail_url,
                kind = excluded.kind,
                duration_secs = excluded.duration_secs,
                source_url = excluded.source_url,
                status = excluded.status,
                local_path = excluded.local_path,
                bytes_downloaded = excluded.bytes_downloaded,
                total_bytes = excluded.total_bytes,
                last_error = excluded.last_error,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.content_id.as_str())
        .bind(&record.title)
        .bind(&record.performer_name)
        .bind(&record.thumbnail_url)
        .bind(record.kind.as_str())
        .bind(record.duration_secs as i64)
        .bind(&record.source_url)
        .bind(record.status.as_str())
        .bind(&record.local_path)
        .bind(record.bytes_downloaded as i64)
        .bind(record.total_bytes.map(|total| total as i64))
        .bind(&record.last_error)
        .bind(record.created_at)
        .bind(now_ms())
        .execute(&self.pool)
        .await
        .map_err(|e| DownloadError::Database(e.to_string()))?;

        self.publish_snapshot().await;
        Ok(())
    }

    #[instrument(skip(self), fields(content_id = %content_id))]
    async fn find_by_content_id(
        &self,
        content_id: &ContentId,
    ) -> Result<Option<DownloadRecord>> {
        let row = sqlx::query("SELECT * FROM downloads WHERE content_id = ?")
            .bind(content_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DownloadError::Database(e.to_string()))?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_status(&self, status: DownloadStatus) -> Result<Vec<DownloadRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM downloads WHERE status = ? ORDER BY created_at ASC, content_id ASC",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DownloadError::Database(e.to_string()))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    #[instrument(skip(self), fields(content_id = %content_id))]
    async fn delete(&self, content_id: &ContentId) -> Result<()> {
        let result = sqlx::query("DELETE FROM downloads WHERE content_id = ?")
            .bind(content_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DownloadError::Database(e.to_string()))?;

        // Deleting an absent row is a no-op, but only a real deletion is
        // worth broadcasting
        if result.rows_affected() > 0 {
            self.publish_snapshot().await;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<DownloadRecord>> {
        let rows =
            sqlx::query("SELECT * FROM downloads ORDER BY created_at ASC, content_id ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DownloadError::Database(e.to_string()))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    #[instrument(skip(self))]
    async fn recover_interrupted(&self) -> Result<Vec<DownloadRecord>> {
        let interrupted = self.find_by_status(DownloadStatus::Downloading).await?;
        if interrupted.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query(
            "UPDATE downloads SET status = ?, last_error = ?, updated_at = ? WHERE status = ?",
        )
        .bind(DownloadStatus::Failed.as_str())
        .bind(INTERRUPTED_ERROR)
        .bind(now_ms())
        .bind(DownloadStatus::Downloading.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DownloadError::Database(e.to_string()))?;

        warn!(
            count = interrupted.len(),
            "Reconciled interrupted downloads to failed"
        );

        self.publish_snapshot().await;

        let mut recovered = Vec::with_capacity(interrupted.len());
        for id in interrupted.iter().map(|record| &record.content_id) {
            if let Some(record) = self.find_by_content_id(id).await? {
                recovered.push(record);
            }
        }
        Ok(recovered)
    }

    async fn observe(&self) -> Result<DownloadsStream> {
        // Subscribe before snapshotting so a write in between is delivered
        // as a follow-up snapshot rather than lost
        let receiver = self.publisher.subscribe();
        let initial = self.list_all().await?;

        Ok(DownloadsStream {
            initial: Some(initial),
            receiver,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use core_catalog::{ContentItem, PerformerId};
    use std::collections::BTreeSet;

    async fn test_store() -> SqliteDownloadStore {
        // One connection: a pooled in-memory SQLite database is otherwise a
        // separate database per connection
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        let store = SqliteDownloadStore::new(pool);
        store.initialize().await.unwrap();
        store
    }

    fn sample_item(id: &str) -> ContentItem {
        ContentItem {
            id: ContentId::new(id).unwrap(),
            title: format!("Recording {}", id),
            description: None,
            kind: ContentKind::Video,
            media_url: format!("https://cdn.heritage.example/{}.mp4", id),
            hls_url: None,
            audio_url: None,
            thumbnail_url: None,
            duration_secs: 120,
            file_size: Some(1_000_000),
            view_count: 0,
            download_count: 0,
            performer_id: PerformerId::new("performer-1").unwrap(),
            performer_name: None,
            categories: BTreeSet::new(),
            published_at: 0,
        }
    }

    fn record(id: &str) -> DownloadRecord {
        DownloadRecord::new(&sample_item(id))
    }

    #[tokio::test]
    async fn test_upsert_and_find() {
        let store = test_store().await;
        let rec = record("perf-1-clip-1");

        store.upsert(&rec).await.unwrap();

        let found = store
            .find_by_content_id(&rec.content_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.content_id, rec.content_id);
        assert_eq!(found.status, DownloadStatus::Queued);
        assert_eq!(found.title, "Recording perf-1-clip-1");
    }

    #[tokio::test]
    async fn test_find_absent_returns_none() {
        let store = test_store().await;
        let id = ContentId::new("perf-0-clip-0").unwrap();
        assert!(store.find_by_content_id(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_last_writer_wins() {
        let store = test_store().await;
        let mut rec = record("perf-1-clip-1");
        store.upsert(&rec).await.unwrap();

        rec.start(Some(1_000_000), 0).unwrap();
        rec.record_progress(123_456).unwrap();
        store.upsert(&rec).await.unwrap();

        let found = store
            .find_by_content_id(&rec.content_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.status, DownloadStatus::Downloading);
        assert_eq!(found.bytes_downloaded, 123_456);
        assert_eq!(found.total_bytes, Some(1_000_000));

        // Still exactly one row
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_preserves_created_at() {
        let store = test_store().await;
        let mut rec = record("perf-1-clip-1");
        store.upsert(&rec).await.unwrap();
        let original = store
            .find_by_content_id(&rec.content_id)
            .await
            .unwrap()
            .unwrap();

        rec.created_at += 999_999;
        store.upsert(&rec).await.unwrap();
        let updated = store
            .find_by_content_id(&rec.content_id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.created_at, original.created_at);
    }

    #[tokio::test]
    async fn test_interleaved_upserts_no_lost_updates() {
        let store = std::sync::Arc::new(test_store().await);

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let rec = record(&format!("perf-1-clip-{}", i));
                store.upsert(&rec).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 8);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = test_store().await;
        let rec = record("perf-1-clip-1");
        store.upsert(&rec).await.unwrap();

        store.delete(&rec.content_id).await.unwrap();
        assert!(store
            .find_by_content_id(&rec.content_id)
            .await
            .unwrap()
            .is_none());

        // Second delete has the same observable effect
        store.delete(&rec.content_id).await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_all_ordered_by_created_at() {
        let store = test_store().await;

        let mut first = record("perf-1-clip-b");
        first.created_at = 1_000;
        let mut second = record("perf-1-clip-a");
        second.created_at = 2_000;

        store.upsert(&second).await.unwrap();
        store.upsert(&first).await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all[0].content_id.as_str(), "perf-1-clip-b");
        assert_eq!(all[1].content_id.as_str(), "perf-1-clip-a");
    }

    #[tokio::test]
    async fn test_recover_interrupted() {
        let store = test_store().await;

        let mut downloading = record("perf-1-clip-1");
        downloading.start(Some(1_000_000), 0).unwrap();
        downloading.record_progress(500_000).unwrap();
        store.upsert(&downloading).await.unwrap();

        let queued = record("perf-1-clip-2");
        store.upsert(&queued).await.unwrap();

        let recovered = store.recover_interrupted().await.unwrap();
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0].status, DownloadStatus::Failed);
        assert_eq!(recovered[0].last_error.as_deref(), Some(INTERRUPTED_ERROR));
        // Partial bytes retained for resume
        assert_eq!(recovered[0].bytes_downloaded, 500_000);

        // Untouched records keep their status
        let queued_after = store
            .find_by_content_id(&queued.content_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(queued_after.status, DownloadStatus::Queued);
    }

    #[tokio::test]
    async fn test_recover_interrupted_empty_store() {
        let store = test_store().await;
        assert!(store.recover_interrupted().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_observe_initial_snapshot() {
        let store = test_store().await;
        let rec = record("perf-1-clip-1");
        store.upsert(&rec).await.unwrap();

        let mut stream = store.observe().await.unwrap();
        let snapshot = stream.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].content_id, rec.content_id);
    }

    #[tokio::test]
    async fn test_observe_emits_on_every_write() {
        let store = test_store().await;
        let mut stream = store.observe().await.unwrap();

        // Initial snapshot: empty
        assert!(stream.recv().await.unwrap().is_empty());

        let rec = record("perf-1-clip-1");
        store.upsert(&rec).await.unwrap();
        let snapshot = stream.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);

        store.delete(&rec.content_id).await.unwrap();
        let snapshot = stream.recv().await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_observe_multiple_independent_subscribers() {
        let store = test_store().await;
        let mut first = store.observe().await.unwrap();
        let mut second = store.observe().await.unwrap();

        assert!(first.recv().await.unwrap().is_empty());
        assert!(second.recv().await.unwrap().is_empty());

        store.upsert(&record("perf-1-clip-1")).await.unwrap();

        // Both observers receive the update, not just one
        assert_eq!(first.recv().await.unwrap().len(), 1);
        assert_eq!(second.recv().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_observe_local_path_invariant() {
        let store = test_store().await;
        let mut stream = store.observe().await.unwrap();
        stream.recv().await.unwrap();

        let mut rec = record("perf-1-clip-1");
        store.upsert(&rec).await.unwrap();
        rec.start(Some(10), 0).unwrap();
        store.upsert(&rec).await.unwrap();
        rec.complete("/tmp/perf-1-clip-1.mp4".to_string()).unwrap();
        store.upsert(&rec).await.unwrap();

        for _ in 0..3 {
            let snapshot = stream.recv().await.unwrap();
            for observed in snapshot {
                assert_eq!(
                    observed.local_path.is_some(),
                    observed.status == DownloadStatus::Completed
                );
            }
        }
    }
}
