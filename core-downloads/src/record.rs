//! # Download Record State Machine
//!
//! Manages the lifecycle of offline downloads with validated state
//! transitions.
//!
//! ## State Machine
//!
//! ```text
//! Queued → Downloading → Completed
//!   ↑          ↓  ↓
//!   ├─────── Failed          (retry → Queued, last_error cleared)
//!   └─────── Paused          (resume → Queued, bytes retained)
//! ```
//!
//! `cancel` and `remove` delete the record outright and are therefore not
//! transitions of this machine; they are orchestrated by the manager.
//!
//! ## Invariants
//!
//! - `local_path` is `Some` if and only if the status is `Completed`.
//! - `bytes_downloaded` never exceeds `total_bytes` once the total is known,
//!   and is monotonically non-decreasing while `Downloading`.
//! - `last_error` is `Some` only while the status is `Failed`.

use crate::error::{DownloadError, Result};
use core_catalog::{ContentId, ContentItem, ContentKind};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Status
// ============================================================================

/// The current status of a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    /// Waiting for a transfer slot
    Queued,
    /// A transfer worker is streaming bytes
    Downloading,
    /// Paused by the user; partial bytes retained
    Paused,
    /// The transfer failed; the reason is in `last_error`
    Failed,
    /// The file is in final storage at `local_path`
    Completed,
}

impl DownloadStatus {
    /// Check if this status represents an in-flight download.
    pub fn is_active(&self) -> bool {
        matches!(self, DownloadStatus::Queued | DownloadStatus::Downloading)
    }

    /// Check if the downloaded file is available for playback.
    pub fn is_available(&self) -> bool {
        matches!(self, DownloadStatus::Completed)
    }

    /// Get the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Queued => "queued",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Paused => "paused",
            DownloadStatus::Failed => "failed",
            DownloadStatus::Completed => "completed",
        }
    }
}

impl FromStr for DownloadStatus {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(DownloadStatus::Queued),
            "downloading" => Ok(DownloadStatus::Downloading),
            "paused" => Ok(DownloadStatus::Paused),
            "failed" => Ok(DownloadStatus::Failed),
            "completed" => Ok(DownloadStatus::Completed),
            _ => Err(DownloadError::Database(format!(
                "Unknown download status: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Download Record Entity
// ============================================================================

/// The local persisted state tracking one content item's offline-download
/// lifecycle. Exactly one record exists per content id at any time.
///
/// Display metadata is captured from the catalog at request time so the
/// downloads list renders without further catalog round trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// The content this download belongs to (unique key)
    pub content_id: ContentId,
    /// Display title captured at request time
    pub title: String,
    /// Performer display name, when the catalog embedded it
    pub performer_name: Option<String>,
    /// Thumbnail URL captured at request time
    pub thumbnail_url: Option<String>,
    /// Video or audio
    pub kind: ContentKind,
    /// Duration in seconds
    pub duration_secs: u32,
    /// Remote URL the transfer streams from
    pub source_url: String,
    /// Current lifecycle status
    pub status: DownloadStatus,
    /// Final file path; `Some` exactly when `status == Completed`
    pub local_path: Option<String>,
    /// Bytes written to local storage so far
    pub bytes_downloaded: u64,
    /// Total size reported by the remote; `None` until the transfer begins
    pub total_bytes: Option<u64>,
    /// Failure reason; `Some` only while `status == Failed`
    pub last_error: Option<String>,
    /// When the download was first requested (Unix epoch milliseconds)
    pub created_at: i64,
    /// When the record was last mutated (Unix epoch milliseconds)
    pub updated_at: i64,
}

impl DownloadRecord {
    /// Create a new queued record from catalog metadata.
    pub fn new(item: &ContentItem) -> Self {
        let now = now_ms();
        Self {
            content_id: item.id.clone(),
            title: item.title.clone(),
            performer_name: item.performer_name.clone(),
            thumbnail_url: item.thumbnail_url.clone(),
            kind: item.kind,
            duration_secs: item.duration_secs,
            source_url: item.media_url.clone(),
            status: DownloadStatus::Queued,
            local_path: None,
            bytes_downloaded: 0,
            total_bytes: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Progress as a fraction in `[0.0, 1.0]`, when the total is known.
    pub fn progress(&self) -> Option<f64> {
        self.total_bytes.map(|total| {
            if total == 0 {
                1.0
            } else {
                (self.bytes_downloaded as f64 / total as f64).min(1.0)
            }
        })
    }

    /// Re-enter the queue from `Paused` or `Failed`.
    ///
    /// Partial bytes are preserved for resume; a failure reason from a
    /// previous attempt is cleared.
    ///
    /// # Errors
    ///
    /// Returns an error unless the record is `Paused` or `Failed`.
    pub fn requeue(&mut self) -> Result<()> {
        self.validate_transition(DownloadStatus::Queued)?;
        self.status = DownloadStatus::Queued;
        self.last_error = None;
        self.touch();
        Ok(())
    }

    /// Begin transferring: a worker picked up the job.
    ///
    /// `total_bytes` is the size reported by the remote (if any) and
    /// `resumed_from` the byte offset the remote actually honored — zero when
    /// the transfer restarts from scratch.
    ///
    /// # Errors
    ///
    /// Returns an error unless the record is `Queued`.
    pub fn start(&mut self, total_bytes: Option<u64>, resumed_from: u64) -> Result<()> {
        self.validate_transition(DownloadStatus::Downloading)?;
        self.status = DownloadStatus::Downloading;
        self.total_bytes = total_bytes;
        self.bytes_downloaded = resumed_from;
        self.touch();
        Ok(())
    }

    /// Record transfer progress.
    ///
    /// `bytes_downloaded` moves monotonically: a stale smaller value is
    /// ignored, and the count is clamped to `total_bytes` once known.
    ///
    /// # Errors
    ///
    /// Returns an error unless the record is `Downloading`.
    pub fn record_progress(&mut self, bytes_downloaded: u64) -> Result<()> {
        if self.status != DownloadStatus::Downloading {
            return Err(DownloadError::InvalidStateTransition {
                from: self.status.to_string(),
                to: "record_progress".to_string(),
                reason: "Progress is only tracked while downloading".to_string(),
            });
        }

        let mut bytes = bytes_downloaded.max(self.bytes_downloaded);
        if let Some(total) = self.total_bytes {
            bytes = bytes.min(total);
        }
        self.bytes_downloaded = bytes;
        self.touch();
        Ok(())
    }

    /// The transfer finished and the file was promoted to `local_path`.
    ///
    /// # Errors
    ///
    /// Returns an error unless the record is `Downloading`.
    pub fn complete(&mut self, local_path: String) -> Result<()> {
        self.validate_transition(DownloadStatus::Completed)?;
        self.status = DownloadStatus::Completed;
        self.local_path = Some(local_path);
        self.last_error = None;
        if let Some(total) = self.total_bytes {
            self.bytes_downloaded = total;
        }
        self.touch();
        Ok(())
    }

    /// The transfer failed. Bytes already on disk are retained for a
    /// potential resume.
    ///
    /// # Errors
    ///
    /// Returns an error unless the record is `Queued` or `Downloading`.
    pub fn fail(&mut self, error_message: impl Into<String>) -> Result<()> {
        self.validate_transition(DownloadStatus::Failed)?;
        self.status = DownloadStatus::Failed;
        self.last_error = Some(error_message.into());
        self.touch();
        Ok(())
    }

    /// Pause the in-flight transfer, retaining bytes on disk.
    ///
    /// # Errors
    ///
    /// Returns an error unless the record is `Downloading`.
    pub fn pause(&mut self) -> Result<()> {
        self.validate_transition(DownloadStatus::Paused)?;
        self.status = DownloadStatus::Paused;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = now_ms();
    }

    /// Validate a state transition.
    fn validate_transition(&self, to: DownloadStatus) -> Result<()> {
        let valid = matches!(
            (self.status, to),
            (DownloadStatus::Queued, DownloadStatus::Downloading)
                | (DownloadStatus::Queued, DownloadStatus::Failed)
                | (DownloadStatus::Downloading, DownloadStatus::Completed)
                | (DownloadStatus::Downloading, DownloadStatus::Failed)
                | (DownloadStatus::Downloading, DownloadStatus::Paused)
                | (DownloadStatus::Paused, DownloadStatus::Queued)
                | (DownloadStatus::Failed, DownloadStatus::Queued)
        );

        if !valid {
            return Err(DownloadError::InvalidStateTransition {
                from: self.status.to_string(),
                to: to.to_string(),
                reason: format!("Cannot transition from {} to {}", self.status, to),
            });
        }

        Ok(())
    }
}

/// Current Unix timestamp in milliseconds.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use core_catalog::PerformerId;
    use std::collections::BTreeSet;

    fn sample_item() -> ContentItem {
        ContentItem {
            id: ContentId::new("perf-12-clip-3").unwrap(),
            title: "Mawwal in Bayati".to_string(),
            description: None,
            kind: ContentKind::Audio,
            media_url: "https://cdn.heritage.example/perf-12-clip-3.mp3".to_string(),
            hls_url: None,
            audio_url: None,
            thumbnail_url: Some("https://cdn.heritage.example/thumb.jpg".to_string()),
            duration_secs: 312,
            file_size: Some(1_000_000),
            view_count: 0,
            download_count: 0,
            performer_id: PerformerId::new("performer-12").unwrap(),
            performer_name: Some("Sheikh Imam".to_string()),
            categories: BTreeSet::new(),
            published_at: 0,
        }
    }

    fn queued_record() -> DownloadRecord {
        DownloadRecord::new(&sample_item())
    }

    #[test]
    fn test_new_record_is_queued() {
        let record = queued_record();
        assert_eq!(record.status, DownloadStatus::Queued);
        assert_eq!(record.bytes_downloaded, 0);
        assert!(record.total_bytes.is_none());
        assert!(record.local_path.is_none());
        assert!(record.last_error.is_none());
        assert_eq!(record.title, "Mawwal in Bayati");
        assert_eq!(record.performer_name.as_deref(), Some("Sheikh Imam"));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(
            DownloadStatus::from_str("queued").unwrap(),
            DownloadStatus::Queued
        );
        assert_eq!(
            DownloadStatus::from_str("DOWNLOADING").unwrap(),
            DownloadStatus::Downloading
        );
        assert!(DownloadStatus::from_str("exploded").is_err());
    }

    #[test]
    fn test_status_predicates() {
        assert!(DownloadStatus::Queued.is_active());
        assert!(DownloadStatus::Downloading.is_active());
        assert!(!DownloadStatus::Paused.is_active());
        assert!(DownloadStatus::Completed.is_available());
        assert!(!DownloadStatus::Failed.is_available());
    }

    #[test]
    fn test_start_sets_total_and_offset() {
        let mut record = queued_record();
        record.start(Some(1_000_000), 0).unwrap();

        assert_eq!(record.status, DownloadStatus::Downloading);
        assert_eq!(record.total_bytes, Some(1_000_000));
        assert_eq!(record.bytes_downloaded, 0);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut record = queued_record();
        record.start(Some(1_000_000), 0).unwrap();

        record.record_progress(500_000).unwrap();
        assert_eq!(record.bytes_downloaded, 500_000);

        // A stale smaller value must not move the counter backwards
        record.record_progress(400_000).unwrap();
        assert_eq!(record.bytes_downloaded, 500_000);
    }

    #[test]
    fn test_progress_clamped_to_total() {
        let mut record = queued_record();
        record.start(Some(1_000), 0).unwrap();

        record.record_progress(2_000).unwrap();
        assert_eq!(record.bytes_downloaded, 1_000);
    }

    #[test]
    fn test_progress_requires_downloading() {
        let mut record = queued_record();
        assert!(record.record_progress(100).is_err());
    }

    #[test]
    fn test_progress_fraction() {
        let mut record = queued_record();
        assert!(record.progress().is_none());

        record.start(Some(1_000), 250).unwrap();
        assert_eq!(record.progress(), Some(0.25));
    }

    #[test]
    fn test_complete_sets_local_path() {
        let mut record = queued_record();
        record.start(Some(1_000), 0).unwrap();
        record.record_progress(1_000).unwrap();
        record
            .complete("/data/offline_media/perf-12-clip-3.mp3".to_string())
            .unwrap();

        assert_eq!(record.status, DownloadStatus::Completed);
        assert_eq!(
            record.local_path.as_deref(),
            Some("/data/offline_media/perf-12-clip-3.mp3")
        );
        assert_eq!(record.bytes_downloaded, 1_000);
    }

    #[test]
    fn test_fail_retains_bytes() {
        let mut record = queued_record();
        record.start(Some(1_000_000), 0).unwrap();
        record.record_progress(500_000).unwrap();
        record.fail("connection reset").unwrap();

        assert_eq!(record.status, DownloadStatus::Failed);
        assert_eq!(record.last_error.as_deref(), Some("connection reset"));
        assert_eq!(record.bytes_downloaded, 500_000);
        assert!(record.local_path.is_none());
    }

    #[test]
    fn test_retry_clears_error_and_keeps_bytes() {
        let mut record = queued_record();
        record.start(Some(1_000_000), 0).unwrap();
        record.record_progress(500_000).unwrap();
        record.fail("connection reset").unwrap();

        record.requeue().unwrap();

        assert_eq!(record.status, DownloadStatus::Queued);
        assert!(record.last_error.is_none());
        assert_eq!(record.bytes_downloaded, 500_000);
    }

    #[test]
    fn test_pause_and_resume() {
        let mut record = queued_record();
        record.start(Some(1_000), 0).unwrap();
        record.record_progress(400).unwrap();
        record.pause().unwrap();

        assert_eq!(record.status, DownloadStatus::Paused);
        assert_eq!(record.bytes_downloaded, 400);

        record.requeue().unwrap();
        assert_eq!(record.status, DownloadStatus::Queued);
        assert_eq!(record.bytes_downloaded, 400);
    }

    #[test]
    fn test_resume_offset_applied_on_restart() {
        let mut record = queued_record();
        record.start(Some(1_000), 0).unwrap();
        record.record_progress(400).unwrap();
        record.pause().unwrap();
        record.requeue().unwrap();

        // Server did not honor the range request; restart from zero
        record.start(Some(1_000), 0).unwrap();
        assert_eq!(record.bytes_downloaded, 0);
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        // Queued cannot pause or complete
        let mut record = queued_record();
        assert!(record.pause().is_err());
        assert!(record.complete("/tmp/x".to_string()).is_err());

        // Completed is terminal for the state machine
        let mut record = queued_record();
        record.start(None, 0).unwrap();
        record.complete("/tmp/x".to_string()).unwrap();
        assert!(record.fail("nope").is_err());
        assert!(record.pause().is_err());
        assert!(record.requeue().is_err());

        // Paused cannot fail without re-entering the queue first
        let mut record = queued_record();
        record.start(None, 0).unwrap();
        record.pause().unwrap();
        assert!(record.fail("nope").is_err());
    }

    #[test]
    fn test_local_path_invariant_across_lifecycle() {
        let mut record = queued_record();
        assert_eq!(record.local_path.is_some(), record.status.is_available());

        record.start(Some(10), 0).unwrap();
        assert_eq!(record.local_path.is_some(), record.status.is_available());

        record.fail("boom").unwrap();
        assert_eq!(record.local_path.is_some(), record.status.is_available());

        record.requeue().unwrap();
        record.start(Some(10), 0).unwrap();
        record.complete("/tmp/file".to_string()).unwrap();
        assert_eq!(record.local_path.is_some(), record.status.is_available());
    }

    #[test]
    fn test_queued_can_fail() {
        // Worker setup errors surface before the transfer starts
        let mut record = queued_record();
        record.fail("download directory unwritable").unwrap();
        assert_eq!(record.status, DownloadStatus::Failed);
    }
}
