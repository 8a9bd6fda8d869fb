//! Remote catalog source boundary.
//!
//! `CatalogSource` is the trait the rest of the core programs against; the
//! production implementation is [`crate::http::HttpCatalogSource`]. Tests
//! substitute doubles to control responses and assert call counts.

use crate::error::Result;
use crate::models::{Category, ContentId, ContentItem, PageRequest, Performer, PerformerId};
use async_trait::async_trait;

/// Read-only boundary over the remote catalog API.
///
/// Implementations perform exactly one round trip per call and do not cache.
/// All operations are idempotent reads, safe to call concurrently.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Paginated content listing, optionally scoped to one performer.
    async fn list_content(
        &self,
        page: PageRequest,
        performer_id: Option<&PerformerId>,
    ) -> Result<Vec<ContentItem>>;

    /// Fetch a single content item by id.
    async fn content_by_id(&self, id: &ContentId) -> Result<ContentItem>;

    /// Currently trending content.
    async fn trending(&self, limit: u32) -> Result<Vec<ContentItem>>;

    /// Recommended content for the requesting client.
    async fn recommended(&self, limit: u32) -> Result<Vec<ContentItem>>;

    /// Most recently published content.
    async fn recent(&self, limit: u32) -> Result<Vec<ContentItem>>;

    /// All performers.
    async fn performers(&self) -> Result<Vec<Performer>>;

    /// Fetch a single performer by id.
    async fn performer_by_id(&self, id: &PerformerId) -> Result<Performer>;

    /// All browsable categories.
    async fn categories(&self) -> Result<Vec<Category>>;

    /// Full-text search over the catalog.
    ///
    /// Callers are expected to have rejected blank queries already; an
    /// implementation receiving one may return whatever the backend does.
    async fn search(&self, query: &str, page: PageRequest) -> Result<Vec<ContentItem>>;
}
