//! HTTP catalog source implementation
//!
//! Implements the `CatalogSource` trait against the heritage backend's
//! read-only JSON API using `reqwest`.
//!
//! # Endpoints
//!
//! - `GET content?page=&limit=[&performerId=]`
//! - `GET content/{id}`
//! - `GET content/trending|recommended|recent?limit=`
//! - `GET performers`, `GET performers/{id}`, `GET performers/{id}/content`
//! - `GET categories`
//! - `GET search?q=&page=&limit=`
//!
//! List endpoints return an envelope of the form `{ "data": [...], "meta":
//! {...} }`; entity endpoints return the entity directly.

use crate::error::{CatalogError, Result};
use crate::source::CatalogSource;
use crate::models::{
    Category, ContentId, ContentItem, ContentKind, PageRequest, Performer, PerformerId,
};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `reqwest`-backed catalog source.
///
/// One instance holds a pooled HTTP client; cloning is cheap and shares the
/// pool.
#[derive(Clone)]
pub struct HttpCatalogSource {
    client: Client,
    base_url: String,
}

impl HttpCatalogSource {
    /// Create a new source pointed at the given API base URL
    /// (e.g. `https://api.heritage.example/v1`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent("heritage-media-core/0.1.0")
            .build()
            .map_err(|e| CatalogError::RemoteUnavailable(format!("HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Create a source with a caller-configured `reqwest::Client`.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Execute a GET and decode the JSON body, mapping transport and status
    /// failures into the catalog error taxonomy.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        entity_type: &str,
        entity_id: &str,
    ) -> Result<T> {
        let url = self.endpoint(path);
        debug!(url = %url, "Fetching from catalog API");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| CatalogError::RemoteUnavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(CatalogError::NotFound {
                entity_type: entity_type.to_string(),
                id: entity_id.to_string(),
            }),
            status if !status.is_success() => Err(CatalogError::RemoteUnavailable(format!(
                "HTTP {} from {}",
                status.as_u16(),
                path
            ))),
            _ => response
                .json::<T>()
                .await
                .map_err(|e| CatalogError::Decode(e.to_string())),
        }
    }

    async fn fetch_content_list(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<ContentItem>> {
        let envelope: ListEnvelope<ContentDto> = self
            .get_json(path, query, "content", path)
            .await?;
        Ok(convert_content_list(envelope.data))
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    #[instrument(skip(self))]
    async fn list_content(
        &self,
        page: PageRequest,
        performer_id: Option<&PerformerId>,
    ) -> Result<Vec<ContentItem>> {
        let mut query = vec![
            ("page", page.page.to_string()),
            ("limit", page.limit.to_string()),
        ];
        if let Some(performer_id) = performer_id {
            query.push(("performerId", performer_id.to_string()));
        }
        self.fetch_content_list("content", &query).await
    }

    #[instrument(skip(self), fields(content_id = %id))]
    async fn content_by_id(&self, id: &ContentId) -> Result<ContentItem> {
        let dto: ContentDto = self
            .get_json(&format!("content/{}", id), &[], "content", id.as_str())
            .await?;
        convert_content(dto)
            .ok_or_else(|| CatalogError::Decode("content item missing id".to_string()))
    }

    #[instrument(skip(self))]
    async fn trending(&self, limit: u32) -> Result<Vec<ContentItem>> {
        self.fetch_content_list("content/trending", &[("limit", limit.to_string())])
            .await
    }

    #[instrument(skip(self))]
    async fn recommended(&self, limit: u32) -> Result<Vec<ContentItem>> {
        self.fetch_content_list("content/recommended", &[("limit", limit.to_string())])
            .await
    }

    #[instrument(skip(self))]
    async fn recent(&self, limit: u32) -> Result<Vec<ContentItem>> {
        self.fetch_content_list("content/recent", &[("limit", limit.to_string())])
            .await
    }

    #[instrument(skip(self))]
    async fn performers(&self) -> Result<Vec<Performer>> {
        let dtos: Vec<PerformerDto> = self
            .get_json("performers", &[], "performers", "performers")
            .await?;
        Ok(dtos.into_iter().filter_map(convert_performer).collect())
    }

    #[instrument(skip(self), fields(performer_id = %id))]
    async fn performer_by_id(&self, id: &PerformerId) -> Result<Performer> {
        let dto: PerformerDto = self
            .get_json(&format!("performers/{}", id), &[], "performer", id.as_str())
            .await?;
        convert_performer(dto)
            .ok_or_else(|| CatalogError::Decode("performer missing id".to_string()))
    }

    #[instrument(skip(self))]
    async fn categories(&self) -> Result<Vec<Category>> {
        let dtos: Vec<CategoryDto> = self
            .get_json("categories", &[], "categories", "categories")
            .await?;
        Ok(dtos.into_iter().map(convert_category).collect())
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, page: PageRequest) -> Result<Vec<ContentItem>> {
        let query = vec![
            ("q", query.to_string()),
            ("page", page.page.to_string()),
            ("limit", page.limit.to_string()),
        ];
        self.fetch_content_list("search", &query).await
    }
}

// ============================================================================
// Wire DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListEnvelope<T> {
    #[serde(default)]
    data: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentDto {
    #[serde(alias = "_id")]
    id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    original_file_url: Option<String>,
    hls_url: Option<String>,
    audio_url: Option<String>,
    thumbnail_url: Option<String>,
    duration: Option<u32>,
    file_size: Option<u64>,
    view_count: Option<u64>,
    download_count: Option<u64>,
    performer: Option<PerformerDto>,
    performer_id: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PerformerDto {
    #[serde(alias = "_id")]
    id: Option<String>,
    name: Option<String>,
    bio: Option<String>,
    image_url: Option<String>,
    location: Option<String>,
    content_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryDto {
    #[serde(alias = "_id")]
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    content_count: Option<u64>,
}

// ============================================================================
// DTO -> Domain conversion
// ============================================================================

/// Parse an RFC 3339 timestamp into Unix epoch milliseconds.
fn parse_timestamp_ms(rfc3339: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(rfc3339)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

fn convert_content(dto: ContentDto) -> Option<ContentItem> {
    let id = ContentId::new(dto.id?).ok()?;

    let performer_name = dto.performer.as_ref().and_then(|p| p.name.clone());
    let raw_performer_id = dto
        .performer_id
        .or_else(|| dto.performer.and_then(|p| p.id))?;
    let performer_id = PerformerId::new(raw_performer_id).ok()?;

    let media_url = dto.original_file_url?;

    let kind = dto
        .kind
        .as_deref()
        .and_then(|k| ContentKind::from_str(k).ok())
        .unwrap_or(ContentKind::Video);

    Some(ContentItem {
        id,
        title: dto.title.unwrap_or_else(|| "Untitled".to_string()),
        description: dto.description,
        kind,
        media_url,
        hls_url: dto.hls_url,
        audio_url: dto.audio_url,
        thumbnail_url: dto.thumbnail_url,
        duration_secs: dto.duration.unwrap_or(0),
        file_size: dto.file_size,
        view_count: dto.view_count.unwrap_or(0),
        download_count: dto.download_count.unwrap_or(0),
        performer_id,
        performer_name,
        categories: dto.categories.into_iter().collect::<BTreeSet<_>>(),
        published_at: dto
            .created_at
            .as_deref()
            .and_then(parse_timestamp_ms)
            .unwrap_or(0),
    })
}

/// Convert a list of DTOs, dropping entries the backend sent without the
/// fields a client cannot work around (id, performer, media URL).
fn convert_content_list(dtos: Vec<ContentDto>) -> Vec<ContentItem> {
    let total = dtos.len();
    let items: Vec<ContentItem> = dtos.into_iter().filter_map(convert_content).collect();
    if items.len() < total {
        warn!(
            dropped = total - items.len(),
            "Dropped malformed content entries from catalog response"
        );
    }
    items
}

fn convert_performer(dto: PerformerDto) -> Option<Performer> {
    let id = PerformerId::new(dto.id?).ok()?;
    Some(Performer {
        id,
        name: dto.name.unwrap_or_else(|| "Unknown".to_string()),
        bio: dto.bio,
        image_url: dto.image_url,
        location: dto.location,
        content_count: dto.content_count.unwrap_or(0),
    })
}

fn convert_category(dto: CategoryDto) -> Category {
    Category {
        id: dto.id.unwrap_or_default(),
        name: dto.name.unwrap_or_else(|| "Untitled".to_string()),
        description: dto.description,
        content_count: dto.content_count.unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_content_dto() -> ContentDto {
        serde_json::from_value(serde_json::json!({
            "_id": "perf-12-clip-3",
            "title": "Mawwal in Bayati",
            "type": "audio",
            "originalFileUrl": "https://cdn.heritage.example/perf-12-clip-3.mp3",
            "audioUrl": "https://cdn.heritage.example/perf-12-clip-3.aac",
            "duration": 312,
            "fileSize": 4800000,
            "viewCount": 120,
            "performerId": "performer-12",
            "categories": ["maqam", "vocal"],
            "createdAt": "2023-06-01T12:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_convert_content() {
        let item = convert_content(sample_content_dto()).unwrap();

        assert_eq!(item.id.as_str(), "perf-12-clip-3");
        assert_eq!(item.title, "Mawwal in Bayati");
        assert_eq!(item.kind, ContentKind::Audio);
        assert_eq!(item.duration_secs, 312);
        assert_eq!(item.file_size, Some(4_800_000));
        assert_eq!(item.performer_id.as_str(), "performer-12");
        assert!(item.categories.contains("maqam"));
        assert_eq!(item.published_at, 1_685_620_800_000);
    }

    #[test]
    fn test_convert_content_defaults() {
        let dto: ContentDto = serde_json::from_value(serde_json::json!({
            "_id": "perf-1-clip-1",
            "originalFileUrl": "https://cdn.heritage.example/a.mp4",
            "performer": { "_id": "performer-1", "name": "Umm Said" }
        }))
        .unwrap();

        let item = convert_content(dto).unwrap();
        assert_eq!(item.title, "Untitled");
        assert_eq!(item.kind, ContentKind::Video);
        assert_eq!(item.performer_id.as_str(), "performer-1");
        assert_eq!(item.performer_name.as_deref(), Some("Umm Said"));
        assert_eq!(item.published_at, 0);
    }

    #[test]
    fn test_convert_content_list_drops_malformed() {
        let missing_id: ContentDto = serde_json::from_value(serde_json::json!({
            "title": "No id",
            "originalFileUrl": "https://cdn.heritage.example/a.mp4",
            "performerId": "performer-1"
        }))
        .unwrap();

        let items = convert_content_list(vec![sample_content_dto(), missing_id]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.as_str(), "perf-12-clip-3");
    }

    #[test]
    fn test_convert_performer() {
        let dto: PerformerDto = serde_json::from_value(serde_json::json!({
            "_id": "performer-12",
            "name": "Sheikh Imam",
            "location": "Cairo",
            "contentCount": 42
        }))
        .unwrap();

        let performer = convert_performer(dto).unwrap();
        assert_eq!(performer.id.as_str(), "performer-12");
        assert_eq!(performer.name, "Sheikh Imam");
        assert_eq!(performer.location.as_deref(), Some("Cairo"));
        assert_eq!(performer.content_count, 42);
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let source =
            HttpCatalogSource::with_client(Client::new(), "https://api.heritage.example/v1/");
        assert_eq!(
            source.endpoint("content/trending"),
            "https://api.heritage.example/v1/content/trending"
        );
    }

    #[test]
    fn test_parse_timestamp_ms() {
        assert_eq!(
            parse_timestamp_ms("1970-01-01T00:00:01Z"),
            Some(1000)
        );
        assert_eq!(parse_timestamp_ms("yesterday"), None);
    }
}
