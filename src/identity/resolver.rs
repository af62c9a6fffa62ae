/// Identity Resolver - fetches PSQR identity documents with caching
use crate::{
    cache::{categories, CacheClient},
    config::IdentityConfig,
    error::{BroadcasterError, BroadcasterResult},
    identity::{did, DidDocument},
};
use tracing::debug;

/// Resolves PSQR DIDs to identity documents.
///
/// Documents are cached as raw JSON under the transliterated DID with the
/// configured TTL; a miss fetches from the identity's own HTTPS origin.
/// Concurrent first resolutions of the same DID may race, which is harmless:
/// each writes the same body.
#[derive(Clone)]
pub struct IdentityResolver {
    cache: CacheClient,
    http_client: reqwest::Client,
    cache_ttl: u64,
}

impl IdentityResolver {
    /// Create a new identity resolver
    pub fn new(cache: CacheClient, config: &IdentityConfig) -> BroadcasterResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("psqr-broadcaster/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| {
                BroadcasterError::Internal(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            cache,
            http_client,
            cache_ttl: config.cache_ttl,
        })
    }

    /// Resolve a DID (or a full KID; the fragment is dropped) to its
    /// identity document.
    ///
    /// Resolution order:
    /// 1. Check the identity cache under the transliterated DID
    /// 2. Derive the document URL and fetch it from the identity's origin
    /// 3. Cache the raw body for subsequent lookups
    pub async fn resolve(&self, did: &str) -> BroadcasterResult<DidDocument> {
        let key = did::cache_key(did)?;

        if let Some(raw) = self.cache.get::<String>(categories::IDENTITY, &key).await? {
            return parse_document(&raw);
        }

        let raw = self.fetch_document(&key).await?;

        self.cache
            .set(categories::IDENTITY, &key, &raw, Some(self.cache_ttl))
            .await?;

        parse_document(&raw)
    }

    /// Drop the cached document so the next resolve re-fetches.
    pub async fn invalidate(&self, did: &str) -> BroadcasterResult<()> {
        let key = did::cache_key(did)?;
        self.cache.delete(categories::IDENTITY, &key).await
    }

    /// Fetch the document body from the DID's origin.
    async fn fetch_document(&self, key: &str) -> BroadcasterResult<String> {
        let url = did::fetch_url(key)?;

        debug!("Fetching identity document from {}", url);

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            BroadcasterError::ResolutionFailure(format!(
                "Failed to fetch identity document: {}",
                e
            ))
        })?;

        if !response.status().is_success() {
            return Err(BroadcasterError::ResolutionFailure(format!(
                "Identity origin returned {} for {}",
                response.status(),
                url
            )));
        }

        response.text().await.map_err(|e| {
            BroadcasterError::ResolutionFailure(format!("Failed to read identity document: {}", e))
        })
    }
}

fn parse_document(raw: &str) -> BroadcasterResult<DidDocument> {
    serde_json::from_str(raw)
        .map_err(|e| BroadcasterError::ResolutionFailure(format!("Invalid identity document: {}", e)))
}
