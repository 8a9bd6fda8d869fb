//! Content repository façade.
//!
//! Single source of truth for catalog reads. Fans out to a [`CatalogSource`]
//! and performs no caching and no retry of its own; every call is one round
//! trip and transient failures surface directly to the caller.

use crate::error::Result;
use crate::models::{Category, ContentId, ContentItem, PageRequest, Performer, PerformerId};
use crate::source::CatalogSource;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Default feed size for trending/recommended/recent.
const DEFAULT_FEED_LIMIT: u32 = 10;

/// Read-only façade over the remote catalog.
///
/// Safe to clone and call concurrently; all operations are idempotent reads.
#[derive(Clone)]
pub struct ContentRepository {
    source: Arc<dyn CatalogSource>,
}

impl ContentRepository {
    /// Create a repository over the given source.
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self { source }
    }

    /// Currently trending content.
    #[instrument(skip(self))]
    pub async fn get_trending(&self) -> Result<Vec<ContentItem>> {
        self.source.trending(DEFAULT_FEED_LIMIT).await
    }

    /// Recommended content.
    #[instrument(skip(self))]
    pub async fn get_recommended(&self) -> Result<Vec<ContentItem>> {
        self.source.recommended(DEFAULT_FEED_LIMIT).await
    }

    /// Most recently published content.
    #[instrument(skip(self))]
    pub async fn get_recent(&self) -> Result<Vec<ContentItem>> {
        self.source.recent(DEFAULT_FEED_LIMIT).await
    }

    /// Paginated content listing.
    #[instrument(skip(self))]
    pub async fn get_content(&self, page: PageRequest) -> Result<Vec<ContentItem>> {
        self.source.list_content(page, None).await
    }

    /// Fetch a single content item by id.
    #[instrument(skip(self), fields(content_id = %id))]
    pub async fn get_content_by_id(&self, id: &ContentId) -> Result<ContentItem> {
        self.source.content_by_id(id).await
    }

    /// All performers.
    #[instrument(skip(self))]
    pub async fn get_performers(&self) -> Result<Vec<Performer>> {
        self.source.performers().await
    }

    /// Fetch a single performer by id.
    #[instrument(skip(self), fields(performer_id = %id))]
    pub async fn get_performer_by_id(&self, id: &PerformerId) -> Result<Performer> {
        self.source.performer_by_id(id).await
    }

    /// Content attributed to one performer. Association is always queried by
    /// foreign key, never duplicated into the performer entity.
    #[instrument(skip(self), fields(performer_id = %performer_id))]
    pub async fn get_performer_content(
        &self,
        performer_id: &PerformerId,
        page: PageRequest,
    ) -> Result<Vec<ContentItem>> {
        self.source.list_content(page, Some(performer_id)).await
    }

    /// All browsable categories.
    #[instrument(skip(self))]
    pub async fn get_categories(&self) -> Result<Vec<Category>> {
        self.source.categories().await
    }

    /// Full-text search over the catalog.
    ///
    /// An empty or whitespace-only query returns an empty result set without
    /// contacting the remote source.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, page: PageRequest) -> Result<Vec<ContentItem>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            debug!("Blank search query short-circuited");
            return Ok(Vec::new());
        }

        self.source.search(trimmed, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::models::ContentKind;
    use async_trait::async_trait;
    use mockall::mock;
    use std::collections::BTreeSet;

    mock! {
        Source {}

        #[async_trait]
        impl CatalogSource for Source {
            #[mockall::concretize]
            async fn list_content(
                &self,
                page: PageRequest,
                performer_id: Option<&PerformerId>,
            ) -> Result<Vec<ContentItem>>;
            async fn content_by_id(&self, id: &ContentId) -> Result<ContentItem>;
            async fn trending(&self, limit: u32) -> Result<Vec<ContentItem>>;
            async fn recommended(&self, limit: u32) -> Result<Vec<ContentItem>>;
            async fn recent(&self, limit: u32) -> Result<Vec<ContentItem>>;
            async fn performers(&self) -> Result<Vec<Performer>>;
            async fn performer_by_id(&self, id: &PerformerId) -> Result<Performer>;
            async fn categories(&self) -> Result<Vec<Category>>;
            async fn search(&self, query: &str, page: PageRequest) -> Result<Vec<ContentItem>>;
        }
    }

    fn sample_item(id: &str) -> ContentItem {
        ContentItem {
            id: ContentId::new(id).unwrap(),
            title: "Test".to_string(),
            description: None,
            kind: ContentKind::Video,
            media_url: "https://cdn.heritage.example/a.mp4".to_string(),
            hls_url: None,
            audio_url: None,
            thumbnail_url: None,
            duration_secs: 60,
            file_size: None,
            view_count: 0,
            download_count: 0,
            performer_id: PerformerId::new("performer-1").unwrap(),
            performer_name: None,
            categories: BTreeSet::new(),
            published_at: 0,
        }
    }

    #[tokio::test]
    async fn test_search_blank_query_short_circuits() {
        let mut source = MockSource::new();
        // The remote source must never be contacted for blank queries
        source.expect_search().times(0);

        let repository = ContentRepository::new(Arc::new(source));

        let results = repository.search("", PageRequest::default()).await.unwrap();
        assert!(results.is_empty());

        let results = repository
            .search("   ", PageRequest::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_trims_query_before_remote_call() {
        let mut source = MockSource::new();
        source
            .expect_search()
            .withf(|query, _| query == "mawwal")
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let repository = ContentRepository::new(Arc::new(source));
        repository
            .search("  mawwal  ", PageRequest::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_trending_passes_through() {
        let mut source = MockSource::new();
        source
            .expect_trending()
            .times(1)
            .returning(|_| Ok(vec![sample_item("perf-1-clip-1")]));

        let repository = ContentRepository::new(Arc::new(source));
        let items = repository.get_trending().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.as_str(), "perf-1-clip-1");
    }

    #[tokio::test]
    async fn test_remote_failure_propagates() {
        let mut source = MockSource::new();
        source
            .expect_recent()
            .returning(|_| Err(CatalogError::RemoteUnavailable("timeout".to_string())));

        let repository = ContentRepository::new(Arc::new(source));
        let err = repository.get_recent().await.unwrap_err();
        assert!(matches!(err, CatalogError::RemoteUnavailable(_)));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_performer_content_scopes_by_foreign_key() {
        let performer_id = PerformerId::new("performer-3").unwrap();
        let mut source = MockSource::new();
        source
            .expect_list_content()
            .withf(|_, performer| (*performer).map(|p| p.as_str()) == Some("performer-3"))
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let repository = ContentRepository::new(Arc::new(source));
        repository
            .get_performer_content(&performer_id, PageRequest::default())
            .await
            .unwrap();
    }
}
