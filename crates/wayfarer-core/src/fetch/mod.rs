//! Content API access.

pub mod queries;

use crate::activity::ActivityLog;
use crate::error::{Result, WayfarerError};
use crate::kinds::ContentKind;
use crate::reduce::RawRecord;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

/// Source of raw records for a content kind.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch the full record list for `kind`. One outbound request, no retries.
    async fn fetch(&self, kind: ContentKind) -> Result<Vec<RawRecord>>;
}

#[async_trait]
impl<S: ContentSource + ?Sized> ContentSource for Arc<S> {
    async fn fetch(&self, kind: ContentKind) -> Result<Vec<RawRecord>> {
        (**self).fetch(kind).await
    }
}

/// Fetch and swallow errors: failures are logged and yield an empty list.
pub async fn fetch_or_empty(
    source: &dyn ContentSource,
    kind: ContentKind,
    log: &ActivityLog,
) -> Vec<RawRecord> {
    match source.fetch(kind).await {
        Ok(records) => records,
        Err(e) => {
            log.error(format!("Error fetching {}: {}", kind, e));
            Vec::new()
        }
    }
}

/// Posts GraphQL queries to a headless CMS endpoint.
pub struct GraphqlFetcher {
    client: Client,
    endpoint: String,
    token: Option<String>,
    language: String,
}

impl GraphqlFetcher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            token: None,
            language: "SV".to_string(),
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Language code used to filter pages (for example `SV`, `EN`).
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ContentSource for GraphqlFetcher {
    async fn fetch(&self, kind: ContentKind) -> Result<Vec<RawRecord>> {
        let body = json!({ "query": queries::query_for(kind, &self.language) });

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(WayfarerError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let payload: Value = serde_json::from_str(&text)
            .map_err(|e| WayfarerError::MalformedResponse(format!("invalid JSON: {}", e)))?;
        extract_nodes(payload, kind)
    }
}

/// Pull `data.<root>.nodes` out of a GraphQL response.
fn extract_nodes(mut payload: Value, kind: ContentKind) -> Result<Vec<RawRecord>> {
    let root = kind.root_field();
    let nodes = payload
        .get_mut("data")
        .and_then(|d| d.get_mut(root))
        .and_then(|r| r.get_mut("nodes"))
        .map(Value::take);
    if let Some(Value::Array(nodes)) = nodes {
        return Ok(nodes);
    }

    let reason = payload
        .pointer("/errors/0/message")
        .and_then(Value::as_str)
        .map(|m| format!("GraphQL error: {}", m))
        .unwrap_or_else(|| format!("missing data.{}.nodes", root));
    Err(WayfarerError::MalformedResponse(reason))
}

impl std::fmt::Debug for GraphqlFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphqlFetcher")
            .field("endpoint", &self.endpoint)
            .field("language", &self.language)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
