/// Feed query pipeline - build, cache, and fetch identity feeds
///
/// Implements the BCF (build, cache, fetch) flow: a feed is defined by the
/// set of identities it aggregates. The identities are sorted, folded into a
/// structured index query, and the query is content-addressed by hashing its
/// serialized form. The hash-to-query mapping is cached for the out-of-band
/// feed refresher before the query is executed, so permutations of the same
/// identity set always land on the same cache entry and feed location.
use crate::{
    cache::{categories, CacheClient},
    config::ServerConfig,
    error::{BroadcasterError, BroadcasterResult},
    index::IndexClient,
};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tracing::debug;

/// Structured index query for an identity feed.
///
/// Field order is load-bearing: the content hash is computed over the
/// serialized form, so fields must serialize in this declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedQuery {
    pub query: BoolQuery,
    pub sort: PublishDateSort,
    pub size: u32,
    pub from: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoolQuery {
    #[serde(rename = "bool")]
    pub clause: ShouldClause,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShouldClause {
    pub should: Vec<IdentityTerm>,
}

/// One `term` clause matching a single identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityTerm {
    pub term: IdentityField,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityField {
    pub identity: TermValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermValue {
    pub value: String,
}

/// Newest-first sort on the publish date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishDateSort {
    #[serde(rename = "publishDate")]
    pub publish_date: String,
}

/// Cache value stored under a query's content hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedQuery {
    pub es_query: FeedQuery,
    pub expiration: u64,
}

/// Cache value stored under a named feed, pointing at its query hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedFeedPointer {
    pub hash: String,
    pub expiration: u64,
}

/// Outcome of a feed build: the query's content hash and the matching
/// document sources, newest first.
#[derive(Debug, Clone)]
pub struct FeedBuild {
    pub hash: String,
    pub documents: Vec<serde_json::Value>,
}

/// Build the canonical feed query for a set of identities.
///
/// Identities are sorted lexicographically first, so any permutation of the
/// same set produces an identical query and therefore an identical hash.
pub fn build_feed_query(mut dids: Vec<String>, size: u32) -> FeedQuery {
    dids.sort();

    let should = dids
        .into_iter()
        .map(|did| IdentityTerm {
            term: IdentityField {
                identity: TermValue { value: did },
            },
        })
        .collect();

    FeedQuery {
        query: BoolQuery {
            clause: ShouldClause { should },
        },
        sort: PublishDateSort {
            publish_date: "desc".to_string(),
        },
        size,
        from: 0,
    }
}

/// Content-address a feed query: SHA-1 over its serialized form.
pub fn query_hash(query: &FeedQuery) -> BroadcasterResult<String> {
    let serialized = serde_json::to_string(query)
        .map_err(|e| BroadcasterError::Internal(format!("Failed to serialize feed query: {}", e)))?;

    Ok(hex::encode(Sha1::digest(serialized.as_bytes())))
}

/// Runs feed builds against the index and maintains the query cache.
#[derive(Clone)]
pub struct FeedPipeline {
    cache: CacheClient,
    index: IndexClient,
    feed_index: String,
    query_ttl_secs: u64,
}

impl FeedPipeline {
    pub fn new(cache: CacheClient, index: IndexClient, config: &ServerConfig) -> Self {
        Self {
            cache,
            index,
            feed_index: config.index.feed_index.clone(),
            query_ttl_secs: config.feed.query_ttl_secs,
        }
    }

    /// Build, cache, and fetch a feed for a set of identities.
    ///
    /// The hash-to-query cache entry is written unconditionally before the
    /// search runs; an empty result set is returned as-is alongside the hash
    /// so callers can still materialize a stable (if empty) feed location.
    pub async fn build_cache_fetch(
        &self,
        dids: Vec<String>,
        size: u32,
    ) -> BroadcasterResult<FeedBuild> {
        let query = build_feed_query(dids, size);
        let hash = query_hash(&query)?;

        self.cache_query(&hash, &query).await?;

        let outcome = self.index.search(&self.feed_index, &query).await?;

        debug!(
            "Feed build {} returned {} document(s)",
            hash,
            outcome.documents.len()
        );

        Ok(FeedBuild {
            hash,
            documents: outcome.documents,
        })
    }

    /// Build a named feed: like [`build_cache_fetch`], but additionally
    /// stores a feedname-to-hash pointer, and an empty result set is a
    /// failure since a named feed must have content to publish.
    ///
    /// [`build_cache_fetch`]: FeedPipeline::build_cache_fetch
    pub async fn register_named_feed(
        &self,
        feedname: &str,
        dids: Vec<String>,
        size: u32,
    ) -> BroadcasterResult<FeedBuild> {
        let query = build_feed_query(dids, size);
        let hash = query_hash(&query)?;

        self.cache_query(&hash, &query).await?;

        let pointer = NamedFeedPointer {
            hash: hash.clone(),
            expiration: self.query_ttl_secs,
        };

        self.cache
            .set(
                categories::FEED,
                feedname,
                &pointer,
                Some(self.query_ttl_secs),
            )
            .await?;

        let outcome = self.index.search(&self.feed_index, &query).await?;

        if outcome.documents.is_empty() {
            return Err(BroadcasterError::NotFound(format!(
                "No documents returned from the search index for feed '{}'",
                feedname
            )));
        }

        debug!(
            "Named feed '{}' registered under {} with {} document(s)",
            feedname,
            hash,
            outcome.documents.len()
        );

        Ok(FeedBuild {
            hash,
            documents: outcome.documents,
        })
    }

    async fn cache_query(&self, hash: &str, query: &FeedQuery) -> BroadcasterResult<()> {
        let entry = CachedQuery {
            es_query: query.clone(),
            expiration: self.query_ttl_secs,
        };

        self.cache
            .set(categories::FEED, hash, &entry, Some(self.query_ttl_secs))
            .await
    }
}
