//! Core service façade for host applications.
//!
//! This crate wires the catalog repository and the download manager into a
//! single handle the host UI talks to. It adds no logic of its own beyond
//! use-case composition: screen-sized reads (`home_feed`), playable source
//! resolution, and download commands addressed by raw id strings from the UI
//! layer.

pub mod error;

pub use error::{Result, ServiceError};

use core_catalog::{
    Category, ContentId, ContentItem, ContentRepository, PageRequest, Performer, PerformerId,
};
use core_downloads::{DownloadManager, DownloadRecord, DownloadsStream};
use std::sync::Arc;
use tracing::instrument;

/// The content for the home screen, fetched in one call.
#[derive(Debug, Clone)]
pub struct HomeFeed {
    pub trending: Vec<ContentItem>,
    pub recommended: Vec<ContentItem>,
    pub recent: Vec<ContentItem>,
}

/// Where the player should read a content item from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayableSource {
    /// Downloaded and available offline at this path.
    Local(String),
    /// Not downloaded; stream from this URL.
    Streaming(String),
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct HeritageService {
    catalog: ContentRepository,
    downloads: Arc<DownloadManager>,
}

impl HeritageService {
    /// Create a new service from its collaborators. The download manager
    /// must already be initialized.
    pub fn new(catalog: ContentRepository, downloads: Arc<DownloadManager>) -> Self {
        Self { catalog, downloads }
    }

    // ========================================================================
    // Catalog reads
    // ========================================================================

    /// Trending, recommended and recent feeds for the home screen. The three
    /// requests run concurrently; a failure of any fails the whole call.
    #[instrument(skip(self))]
    pub async fn home_feed(&self) -> Result<HomeFeed> {
        let (trending, recommended, recent) = tokio::try_join!(
            self.catalog.get_trending(),
            self.catalog.get_recommended(),
            self.catalog.get_recent(),
        )?;

        Ok(HomeFeed {
            trending,
            recommended,
            recent,
        })
    }

    /// Fetch a content item by raw id.
    pub async fn content_by_id(&self, content_id: &str) -> Result<ContentItem> {
        let id = ContentId::new(content_id)?;
        Ok(self.catalog.get_content_by_id(&id).await?)
    }

    /// All performers.
    pub async fn performers(&self) -> Result<Vec<Performer>> {
        Ok(self.catalog.get_performers().await?)
    }

    /// Fetch a performer by raw id.
    pub async fn performer_by_id(&self, performer_id: &str) -> Result<Performer> {
        let id = PerformerId::new(performer_id)?;
        Ok(self.catalog.get_performer_by_id(&id).await?)
    }

    /// Content attributed to a performer.
    pub async fn performer_content(
        &self,
        performer_id: &str,
        page: PageRequest,
    ) -> Result<Vec<ContentItem>> {
        let id = PerformerId::new(performer_id)?;
        Ok(self.catalog.get_performer_content(&id, page).await?)
    }

    /// All browsable categories.
    pub async fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.catalog.get_categories().await?)
    }

    /// Search the catalog. Blank queries return an empty result without a
    /// remote round trip.
    pub async fn search(&self, query: &str, page: PageRequest) -> Result<Vec<ContentItem>> {
        Ok(self.catalog.search(query, page).await?)
    }

    // ========================================================================
    // Player support
    // ========================================================================

    /// Resolve where the player should read a content item from: the local
    /// file when the download is completed, otherwise the streaming URL
    /// (HLS preferred for video, the audio rendition for audio).
    #[instrument(skip(self))]
    pub async fn playable_source(&self, content_id: &str) -> Result<PlayableSource> {
        let id = ContentId::new(content_id)?;

        if let Ok(record) = self.downloads.get_record(&id).await {
            if let (true, Some(path)) = (record.status.is_available(), record.local_path) {
                return Ok(PlayableSource::Local(path));
            }
        }

        let item = self.catalog.get_content_by_id(&id).await?;
        Ok(PlayableSource::Streaming(item.streaming_url().to_string()))
    }

    // ========================================================================
    // Download commands
    // ========================================================================

    /// Request an offline download.
    pub async fn request_download(&self, content_id: &str) -> Result<DownloadRecord> {
        let id = ContentId::new(content_id)?;
        Ok(self.downloads.request_download(&id).await?)
    }

    /// Pause an in-flight download.
    pub async fn pause_download(&self, content_id: &str) -> Result<()> {
        let id = ContentId::new(content_id)?;
        Ok(self.downloads.pause(&id).await?)
    }

    /// Resume a paused download.
    pub async fn resume_download(&self, content_id: &str) -> Result<DownloadRecord> {
        let id = ContentId::new(content_id)?;
        Ok(self.downloads.resume(&id).await?)
    }

    /// Retry a failed download.
    pub async fn retry_download(&self, content_id: &str) -> Result<DownloadRecord> {
        let id = ContentId::new(content_id)?;
        Ok(self.downloads.retry(&id).await?)
    }

    /// Cancel a download in any state and delete its record.
    pub async fn cancel_download(&self, content_id: &str) -> Result<()> {
        let id = ContentId::new(content_id)?;
        Ok(self.downloads.cancel(&id).await?)
    }

    /// Remove a completed download and unlink its file.
    pub async fn remove_download(&self, content_id: &str) -> Result<()> {
        let id = ContentId::new(content_id)?;
        Ok(self.downloads.remove(&id).await?)
    }

    /// Whether the content item is available offline.
    pub async fn is_downloaded(&self, content_id: &str) -> Result<bool> {
        let id = ContentId::new(content_id)?;
        Ok(self.downloads.is_downloaded(&id).await?)
    }

    /// All download records for the downloads screen.
    pub async fn downloads(&self) -> Result<Vec<DownloadRecord>> {
        Ok(self.downloads.list_downloads().await?)
    }

    /// Observe the downloads list reactively: a full snapshot on subscribe,
    /// then a fresh snapshot after every change.
    pub async fn observe_downloads(&self) -> Result<DownloadsStream> {
        Ok(self.downloads.observe_downloads().await?)
    }
}
