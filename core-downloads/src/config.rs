//! Download manager configuration

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the download manager.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Directory that holds downloaded media and in-flight temp files.
    /// Exclusively owned by the download manager.
    pub download_dir: PathBuf,

    /// Number of concurrent transfers allowed (default: 2)
    pub max_concurrent_transfers: usize,

    /// Timeout for a single transfer attempt (default: 600s)
    pub transfer_timeout: Duration,

    /// Persist progress to the record store every N bytes (default: 256 KiB)
    pub progress_flush_bytes: u64,

    /// Event bus buffer size used for lifecycle events
    pub event_buffer_size: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("offline_media"),
            max_concurrent_transfers: 2,
            transfer_timeout: Duration::from_secs(600),
            progress_flush_bytes: 256 * 1024,
            event_buffer_size: 100,
        }
    }
}

impl DownloadConfig {
    /// Create a configuration rooted at the given download directory.
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            ..Self::default()
        }
    }

    /// Set maximum concurrent transfers.
    pub fn with_max_concurrent_transfers(mut self, count: usize) -> Self {
        self.max_concurrent_transfers = count;
        self
    }

    /// Set the transfer timeout.
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    /// Set the progress flush interval in bytes.
    pub fn with_progress_flush_bytes(mut self, bytes: u64) -> Self {
        self.progress_flush_bytes = bytes;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.download_dir.as_os_str().is_empty() {
            return Err("download_dir cannot be empty".to_string());
        }

        if self.max_concurrent_transfers == 0 {
            return Err("max_concurrent_transfers must be at least 1".to_string());
        }

        if self.progress_flush_bytes == 0 {
            return Err("progress_flush_bytes must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DownloadConfig::default();
        assert_eq!(config.max_concurrent_transfers, 2);
        assert_eq!(config.progress_flush_bytes, 256 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = DownloadConfig::new("/tmp/media")
            .with_max_concurrent_transfers(4)
            .with_transfer_timeout(Duration::from_secs(120))
            .with_progress_flush_bytes(1024);

        assert_eq!(config.download_dir, PathBuf::from("/tmp/media"));
        assert_eq!(config.max_concurrent_transfers, 4);
        assert_eq!(config.transfer_timeout, Duration::from_secs(120));
        assert_eq!(config.progress_flush_bytes, 1024);
    }

    #[test]
    fn test_config_validation() {
        let no_slots = DownloadConfig::default().with_max_concurrent_transfers(0);
        assert!(no_slots.validate().is_err());

        let no_flush = DownloadConfig::default().with_progress_flush_bytes(0);
        assert!(no_flush.validate().is_err());

        let no_dir = DownloadConfig::new("");
        assert!(no_dir.validate().is_err());
    }
}
