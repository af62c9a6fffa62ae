/// Search index client - document search, lookup, and purge over HTTP
///
/// Thin client for the Elasticsearch-compatible index that backs feeds and
/// search. Callers pass the index name per operation; credentials and the
/// base endpoint come from [`IndexConfig`].
use crate::{
    config::IndexConfig,
    error::{BroadcasterError, BroadcasterResult},
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// HTTP client for the search index.
#[derive(Clone)]
pub struct IndexClient {
    http_client: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

/// Result of a search: how many documents matched in total, and the
/// `_source` bodies of the returned window.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub total: u64,
    pub documents: Vec<serde_json::Value>,
}

/// Result of a delete-by-query purge.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PurgeOutcome {
    pub deleted: u64,
    pub failures: u64,
}

impl IndexClient {
    /// Create a new index client
    pub fn new(config: &IndexConfig) -> BroadcasterResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("psqr-broadcaster/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                BroadcasterError::Internal(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Execute a search query against an index and return the matching
    /// document sources.
    pub async fn search<Q: Serialize + ?Sized>(
        &self,
        index: &str,
        query: &Q,
    ) -> BroadcasterResult<SearchOutcome> {
        let response = self
            .request(Method::GET, &format!("{}/_search", index))
            .json(query)
            .send()
            .await
            .map_err(|e| {
                BroadcasterError::IndexUnavailable(format!("search request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(BroadcasterError::IndexUnavailable(format!(
                "search on '{}' returned {}",
                index,
                response.status()
            )));
        }

        let body: SearchResponse = response.json().await.map_err(|e| {
            BroadcasterError::IndexUnavailable(format!("malformed search response: {}", e))
        })?;

        let outcome = SearchOutcome {
            total: body.hits.total.value,
            documents: body.hits.hits.into_iter().map(|h| h.source).collect(),
        };

        debug!(
            "Index search on '{}': {} of {} hit(s) returned",
            index,
            outcome.documents.len(),
            outcome.total
        );

        Ok(outcome)
    }

    /// Fetch a single document by id and return its `_source`.
    pub async fn get_document(
        &self,
        index: &str,
        id: &str,
    ) -> BroadcasterResult<serde_json::Value> {
        let response = self
            .request(Method::GET, &format!("{}/_doc/{}", index, id))
            .send()
            .await
            .map_err(|e| {
                BroadcasterError::IndexUnavailable(format!("document fetch failed: {}", e))
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BroadcasterError::NotFound(format!(
                "document '{}' does not exist in index '{}'",
                id, index
            )));
        }

        if !response.status().is_success() {
            return Err(BroadcasterError::IndexUnavailable(format!(
                "document fetch on '{}' returned {}",
                index,
                response.status()
            )));
        }

        let body: DocumentResponse = response.json().await.map_err(|e| {
            BroadcasterError::IndexUnavailable(format!("malformed document response: {}", e))
        })?;

        match body.source {
            Some(source) if body.found => Ok(source),
            _ => Err(BroadcasterError::NotFound(format!(
                "document '{}' does not exist in index '{}'",
                id, index
            ))),
        }
    }

    /// Delete a single document by id.
    pub async fn delete_document(&self, index: &str, id: &str) -> BroadcasterResult<()> {
        let response = self
            .request(Method::DELETE, &format!("{}/_doc/{}", index, id))
            .send()
            .await
            .map_err(|e| {
                BroadcasterError::IndexUnavailable(format!("document delete failed: {}", e))
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BroadcasterError::NotFound(format!(
                "document '{}' does not exist in index '{}'",
                id, index
            )));
        }

        if !response.status().is_success() {
            return Err(BroadcasterError::IndexUnavailable(format!(
                "document delete on '{}' returned {}",
                index,
                response.status()
            )));
        }

        debug!("Deleted document '{}' from index '{}'", id, index);

        Ok(())
    }

    /// Delete every document matching a query and report how many went.
    pub async fn delete_by_query<Q: Serialize + ?Sized>(
        &self,
        index: &str,
        query: &Q,
    ) -> BroadcasterResult<PurgeOutcome> {
        let response = self
            .request(Method::POST, &format!("{}/_delete_by_query", index))
            .json(query)
            .send()
            .await
            .map_err(|e| BroadcasterError::IndexUnavailable(format!("purge failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(BroadcasterError::IndexUnavailable(format!(
                "purge on '{}' returned {}",
                index,
                response.status()
            )));
        }

        let body: DeleteByQueryResponse = response.json().await.map_err(|e| {
            BroadcasterError::IndexUnavailable(format!("malformed purge response: {}", e))
        })?;

        let outcome = PurgeOutcome {
            deleted: body.deleted,
            failures: body.failures.len() as u64,
        };

        debug!(
            "Purged {} doc(s) from index '{}' with {} failure(s)",
            outcome.deleted, index, outcome.failures
        );

        Ok(outcome)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http_client
            .request(method, format!("{}/{}", self.base_url, path));

        if let Some(username) = &self.username {
            builder = builder.basic_auth(username, self.password.as_deref());
        }

        builder
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    total: HitTotal,
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct HitTotal {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_source")]
    source: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct DocumentResponse {
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source")]
    source: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct DeleteByQueryResponse {
    #[serde(default)]
    deleted: u64,
    #[serde(default)]
    failures: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> IndexConfig {
        IndexConfig {
            url: "https://index.example.com:9200/".to_string(),
            username: Some("broadcaster".to_string()),
            password: Some("hunter2".to_string()),
            feed_index: "feed".to_string(),
            content_index: "content".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = IndexClient::new(&test_config()).unwrap();
        assert_eq!(client.base_url, "https://index.example.com:9200");
    }

    #[test]
    fn test_search_response_deserialization() {
        let raw = r#"{
            "took": 3,
            "timed_out": false,
            "hits": {
                "total": { "value": 2, "relation": "eq" },
                "max_score": 1.0,
                "hits": [
                    { "_index": "feed", "_id": "a", "_source": { "infoHash": "a" } },
                    { "_index": "feed", "_id": "b", "_source": { "infoHash": "b" } }
                ]
            }
        }"#;

        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.hits.total.value, 2);
        assert_eq!(parsed.hits.hits.len(), 2);
        assert_eq!(parsed.hits.hits[0].source["infoHash"], "a");
    }

    #[test]
    fn test_document_response_not_found_shape() {
        let raw = r#"{ "_index": "content", "_id": "missing", "found": false }"#;

        let parsed: DocumentResponse = serde_json::from_str(raw).unwrap();
        assert!(!parsed.found);
        assert!(parsed.source.is_none());
    }

    #[test]
    fn test_delete_by_query_response_deserialization() {
        let raw = r#"{ "took": 12, "deleted": 7, "failures": [] }"#;

        let parsed: DeleteByQueryResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.deleted, 7);
        assert!(parsed.failures.is_empty());
    }
}
