/// Search execution and page caching
///
/// A search runs against the index once, capped at a configured result
/// limit, and the full result set is chunked into fixed-size pages. Every
/// page is content-addressed by hashing the original request with that
/// page's number and written to the page store, so follow-up page fetches
/// never re-run the query.
use crate::{
    config::ServerConfig,
    error::{BroadcasterError, BroadcasterResult},
    index::IndexClient,
    storage::PageStore,
};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tracing::debug;

/// The canonical, hashed form of a search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub term: String,
    pub page: u64,
}

/// One cached page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub per_page: usize,
    pub total_results: usize,
    pub page: u64,
    pub results: Vec<serde_json::Value>,
}

/// Outcome of running a search for a requested page.
#[derive(Debug, Clone)]
pub enum SearchRun {
    /// The requested page, cached or freshly built.
    Page(SearchPage),
    /// The term matched nothing; nothing was cached.
    Empty,
    /// The term matched, but the requested page number exceeds the page
    /// count. Earlier pages were still built and cached.
    OutOfRange,
}

/// Free-text query sent to the index.
#[derive(Debug, Clone, Serialize)]
struct TermSearch {
    query: QueryStringClause,
    size: u32,
}

#[derive(Debug, Clone, Serialize)]
struct QueryStringClause {
    query_string: QueryString,
}

#[derive(Debug, Clone, Serialize)]
struct QueryString {
    query: String,
}

/// Content-address a search request: SHA-1 over its serialized form.
pub fn request_hash(term: &str, page: u64) -> BroadcasterResult<String> {
    let request = SearchRequest {
        term: term.to_string(),
        page,
    };

    let serialized = serde_json::to_string(&request).map_err(|e| {
        BroadcasterError::Internal(format!("Failed to serialize search request: {}", e))
    })?;

    Ok(hex::encode(Sha1::digest(serialized.as_bytes())))
}

#[derive(Clone)]
pub struct SearchService {
    index: IndexClient,
    pages: PageStore,
    content_index: String,
    max_per_page: usize,
    result_limit: u32,
}

impl SearchService {
    pub fn new(index: IndexClient, pages: PageStore, config: &ServerConfig) -> Self {
        Self {
            index,
            pages,
            content_index: config.index.content_index.clone(),
            max_per_page: config.search.max_per_page,
            result_limit: config.search.result_limit,
        }
    }

    /// Fetch a previously built page by its content hash.
    pub async fn lookup_page(&self, hash: &str) -> BroadcasterResult<Option<SearchPage>> {
        self.pages.get_page(hash).await
    }

    /// Run a search for a term, serving from the page cache when possible.
    ///
    /// On a cache miss the query executes once and every page of the result
    /// set is cached, so any page of this search becomes retrievable by
    /// hash without another index round trip.
    pub async fn run(&self, term: &str, page: u64) -> BroadcasterResult<SearchRun> {
        let hash = request_hash(term, page)?;

        if let Some(cached) = self.pages.get_page(&hash).await? {
            debug!("Search page cache HIT: {}", hash);
            return Ok(SearchRun::Page(cached));
        }

        let query = TermSearch {
            query: QueryStringClause {
                query_string: QueryString {
                    query: term.to_string(),
                },
            },
            size: self.result_limit,
        };

        let outcome = self.index.search(&self.content_index, &query).await?;

        if outcome.documents.is_empty() {
            debug!("Search for '{}' matched nothing", term);
            return Ok(SearchRun::Empty);
        }

        let total_results = outcome.documents.len();
        let mut requested = None;

        for (i, chunk) in outcome.documents.chunks(self.max_per_page).enumerate() {
            let number = (i + 1) as u64;
            let built = SearchPage {
                per_page: self.max_per_page,
                total_results,
                page: number,
                results: chunk.to_vec(),
            };

            let page_hash = request_hash(term, number)?;
            self.pages.put_page(&page_hash, &built).await?;

            if number == page {
                requested = Some(built);
            }
        }

        debug!(
            "Search for '{}' cached {} page(s) of {} result(s)",
            term,
            total_results.div_ceil(self.max_per_page),
            total_results
        );

        Ok(match requested {
            Some(built) => SearchRun::Page(built),
            None => SearchRun::OutOfRange,
        })
    }
}
