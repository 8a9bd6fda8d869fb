//! # Offline Downloads Module
//!
//! Manages the offline download lifecycle for catalog content.
//!
//! ## Overview
//!
//! This crate owns everything between "the user tapped download" and "the
//! file is on disk":
//!
//! - **Download Record State Machine** (`record`): validated lifecycle
//!   transitions (queued → downloading → paused/failed → completed)
//! - **Download Record Store** (`store`): durable SQLite table with a live,
//!   snapshot-per-write observation channel for the UI
//! - **Media Transport** (`transport`): byte-stream boundary with an HTTP
//!   implementation supporting byte-range resume
//! - **Download Manager** (`manager`): per-id single-flight orchestration,
//!   bounded worker pool, prompt cancellation, restart reconciliation
//!
//! ## Usage
//!
//! ```ignore
//! use core_downloads::{DownloadConfig, DownloadManager, HttpMediaTransport, SqliteDownloadStore};
//! use std::sync::Arc;
//!
//! # async fn example(pool: sqlx::SqlitePool, catalog: core_catalog::ContentRepository) -> core_downloads::Result<()> {
//! let store = Arc::new(SqliteDownloadStore::new(pool));
//! let transport = Arc::new(HttpMediaTransport::new()?);
//! let manager = DownloadManager::new(
//!     DownloadConfig::new("/data/offline_media"),
//!     store,
//!     catalog,
//!     transport,
//! );
//! manager.initialize().await?;
//!
//! let record = manager
//!     .request_download(&core_catalog::ContentId::new("perf-12-clip-3")?)
//!     .await?;
//! println!("queued: {}", record.title);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod record;
pub mod store;
pub mod transport;

pub use config::DownloadConfig;
pub use error::{DownloadError, Result};
pub use manager::DownloadManager;
pub use record::{DownloadRecord, DownloadStatus};
pub use store::{
    DownloadStore, DownloadsStream, SqliteDownloadStore, INTERRUPTED_ERROR,
};
pub use transport::{HttpMediaTransport, MediaStream, MediaTransport};
