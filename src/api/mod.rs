//! Wire contract for the dashboard API.
//!
//! The core consumes the REST backend through the narrow [`ApiTransport`]
//! trait; [`HttpTransport`] is the reqwest-backed implementation. Entity
//! bodies are snake_case JSON; the pagination meta, schedule payload and
//! query parameter names are camelCase, matching the backend.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Entity, EntityKind, Post};
use crate::error::{AppError, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Envelope and query types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub meta: Option<ResponseMeta>,
}

impl<T> ApiResponse<T> {
    /// Unwraps the envelope: `success` with a body, or a typed error.
    pub fn into_data(self) -> Result<T> {
        if !self.success {
            return Err(AppError::Api(
                self.error.unwrap_or_else(|| "unspecified api error".into()),
            ));
        }
        self.data
            .ok_or_else(|| AppError::Api("success response with no data".into()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMeta {
    pub pagination: Option<PaginationMeta>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

/// One fetched page plus its pagination meta.
#[derive(Debug, Clone)]
pub struct EntityPage {
    pub entities: Vec<Entity>,
    pub page: u32,
    pub total: u64,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Filter/sort/pagination parameters for a list request. The facet field
/// maps onto the kind-specific query parameter (platform for posts,
/// category for insights, source for transcripts).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub facet: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl EntityQuery {
    fn facet_param(kind: EntityKind) -> &'static str {
        match kind {
            EntityKind::Transcript => "source",
            EntityKind::Insight => "category",
            EntityKind::Post => "platform",
        }
    }

    /// Query-string pairs for the GET request.
    pub fn to_params(&self, kind: EntityKind) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(status) = &self.status {
            params.push(("status", status.clone()));
        }
        if let Some(search) = &self.search {
            params.push(("search", search.clone()));
        }
        if let Some(facet) = &self.facet {
            params.push((Self::facet_param(kind), facet.clone()));
        }
        if let Some(sort_by) = &self.sort_by {
            params.push(("sortBy", sort_by.clone()));
        }
        if let Some(order) = self.sort_order {
            params.push(("sortOrder", order.as_str().to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset", offset.to_string()));
        }
        params
    }

    /// Stable signature of the filter-relevant parts (limit/offset
    /// excluded). Page cache keys carry this so results issued under old
    /// filters land on keys nobody reads.
    pub fn filter_signature(&self, kind: EntityKind) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            kind.as_path(),
            self.status.as_deref().unwrap_or(""),
            self.search.as_deref().unwrap_or(""),
            self.facet.as_deref().unwrap_or(""),
            self.sort_by.as_deref().unwrap_or(""),
            self.sort_order.map(|o| o.as_str()).unwrap_or(""),
        )
    }
}

/// Partial field set for `PATCH /entities/{kind}/{id}`. Absent fields are
/// omitted from the body; `scheduled_for: Some(None)` clears the instant.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub char_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<Option<DateTime<Utc>>>,
}

impl EntityPatch {
    pub fn status(status: &str) -> Self {
        Self {
            status: Some(status.to_string()),
            ..Default::default()
        }
    }

    /// Patch derived from an already-transitioned entity: the status plus
    /// any status-coupled field the transition normalized.
    pub fn from_transition(entity: &Entity) -> Self {
        let mut patch = Self::status(entity.status_name());
        if let Entity::Post(post) = entity {
            patch.scheduled_for = Some(post.scheduled_for);
        }
        patch
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SchedulePayload {
    scheduled_for: String,
}

// ============================================================================
// Transport seam
// ============================================================================

/// The narrow request/response seam the core consumes. The concrete REST
/// transport lives behind it; tests substitute an in-memory mock.
pub trait ApiTransport: Send + Sync + 'static {
    /// `GET /entities/{kind}?status&search&sortBy&sortOrder&limit&offset`
    fn list(
        &self,
        kind: EntityKind,
        query: &EntityQuery,
    ) -> impl Future<Output = Result<EntityPage>> + Send;

    /// `PATCH /entities/{kind}/{id}` — returns the authoritative entity.
    fn update(
        &self,
        kind: EntityKind,
        id: i64,
        patch: &EntityPatch,
    ) -> impl Future<Output = Result<Entity>> + Send;

    /// `POST /posts/{id}/schedule` with an ISO-8601 UTC instant.
    fn schedule(
        &self,
        id: i64,
        scheduled_for: DateTime<Utc>,
    ) -> impl Future<Output = Result<Post>> + Send;

    /// `DELETE /entities/{kind}/{id}`
    fn delete(&self, kind: EntityKind, id: i64) -> impl Future<Output = Result<()>> + Send;
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// Reqwest-backed transport for the dashboard API.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn entity_url(&self, kind: EntityKind) -> String {
        format!("{}/entities/{}", self.base_url, kind.as_path())
    }

    async fn check<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<ApiResponse<T>> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Api(format!("{}: {}", status, body)));
        }
        Ok(response.json::<ApiResponse<T>>().await?)
    }
}

impl ApiTransport for HttpTransport {
    async fn list(&self, kind: EntityKind, query: &EntityQuery) -> Result<EntityPage> {
        let response = self
            .client
            .get(self.entity_url(kind))
            .query(&query.to_params(kind))
            .send()
            .await?;

        let envelope: ApiResponse<Vec<Entity>> = Self::check(response).await?;
        let pagination = envelope.meta.as_ref().and_then(|m| m.pagination.clone());
        let entities = envelope.into_data()?;

        let (page, total, total_pages) = match pagination {
            Some(p) => (p.page, p.total, p.total_pages),
            // Unpaginated responses (client strategy) are one whole page.
            None => (0, entities.len() as u64, 1),
        };

        Ok(EntityPage {
            entities,
            page,
            total,
            total_pages,
        })
    }

    async fn update(&self, kind: EntityKind, id: i64, patch: &EntityPatch) -> Result<Entity> {
        let url = format!("{}/{}", self.entity_url(kind), id);
        let response = self.client.patch(&url).json(patch).send().await?;
        let envelope: ApiResponse<Entity> = Self::check(response).await?;
        envelope.into_data()
    }

    async fn schedule(&self, id: i64, scheduled_for: DateTime<Utc>) -> Result<Post> {
        let url = format!("{}/posts/{}/schedule", self.base_url, id);
        let payload = SchedulePayload {
            scheduled_for: scheduled_for.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let response = self.client.post(&url).json(&payload).send().await?;
        let envelope: ApiResponse<Post> = Self::check(response).await?;
        envelope.into_data()
    }

    async fn delete(&self, kind: EntityKind, id: i64) -> Result<()> {
        let url = format!("{}/{}", self.entity_url(kind), id);
        let response = self.client.delete(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Api(format!("{}: {}", status, body)));
        }
        Ok(())
    }
}
