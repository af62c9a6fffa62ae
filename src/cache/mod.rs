/// Redis-based cache-aside store for the PSQR broadcaster
///
/// Backs the two cache-addressed data sets the engine depends on:
/// - resolved DID documents, keyed by their transliterated DID
/// - content-addressed feed queries (hash → query) and named-feed pointers
///
/// Values are opaque JSON at this layer; every entry carries a per-key TTL.
use crate::error::{BroadcasterError, BroadcasterResult};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Cache layer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub redis_url: String,

    /// Key prefix for all cache entries (default: "psqr:")
    pub key_prefix: String,

    /// Default TTL for cache entries in seconds when a caller passes none
    pub default_ttl: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "psqr:".to_string(),
            default_ttl: 300,
        }
    }
}

impl CacheConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("PSQR_REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            key_prefix: std::env::var("PSQR_CACHE_KEY_PREFIX")
                .unwrap_or_else(|_| "psqr:".to_string()),
            default_ttl: std::env::var("PSQR_CACHE_DEFAULT_TTL")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),
        }
    }
}

/// Redis cache client
#[derive(Clone)]
pub struct CacheClient {
    connection: ConnectionManager,
    config: CacheConfig,
}

impl CacheClient {
    /// Create a new cache client
    pub async fn new(config: CacheConfig) -> BroadcasterResult<Self> {
        info!("Connecting to Redis at {}", config.redis_url);

        let client = Client::open(config.redis_url.as_str()).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            BroadcasterError::Cache(e)
        })?;

        let connection = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to connect to Redis: {}", e);
            BroadcasterError::Cache(e)
        })?;

        info!("✓ Redis connection established");

        Ok(Self { connection, config })
    }

    /// Build a cache key with prefix
    fn build_key(&self, category: &str, key: &str) -> String {
        format!("{}{}{}", self.config.key_prefix, category, key)
    }

    /// Get a value from cache
    pub async fn get<T: DeserializeOwned>(
        &self,
        category: &str,
        key: &str,
    ) -> BroadcasterResult<Option<T>> {
        let cache_key = self.build_key(category, key);

        debug!("Cache GET: {}", cache_key);

        let mut conn = self.connection.clone();
        let result: Option<String> = conn.get(&cache_key).await.map_err(|e| {
            warn!("Redis GET failed for {}: {}", cache_key, e);
            BroadcasterError::Cache(e)
        })?;

        match result {
            Some(json) => {
                debug!("Cache HIT: {}", cache_key);
                match serde_json::from_str(&json) {
                    Ok(value) => Ok(Some(value)),
                    Err(e) => {
                        warn!("Failed to deserialize cached value: {}", e);
                        // Delete corrupted cache entry
                        let _ = self.delete(category, key).await;
                        Ok(None)
                    }
                }
            }
            None => {
                debug!("Cache MISS: {}", cache_key);
                Ok(None)
            }
        }
    }

    /// Set a value in cache with TTL
    pub async fn set<T: Serialize>(
        &self,
        category: &str,
        key: &str,
        value: &T,
        ttl_secs: Option<u64>,
    ) -> BroadcasterResult<()> {
        let cache_key = self.build_key(category, key);
        let ttl = ttl_secs.unwrap_or(self.config.default_ttl);

        debug!("Cache SET: {} (TTL: {}s)", cache_key, ttl);

        let json = serde_json::to_string(value).map_err(|e| {
            error!("Failed to serialize value for cache: {}", e);
            BroadcasterError::Internal(format!("Cache serialization failed: {}", e))
        })?;

        let mut conn = self.connection.clone();
        let _: () = conn.set_ex(&cache_key, json, ttl).await.map_err(|e| {
            warn!("Redis SET failed for {}: {}", cache_key, e);
            BroadcasterError::Cache(e)
        })?;

        debug!("Cache SET successful: {}", cache_key);
        Ok(())
    }

    /// Delete a value from cache
    pub async fn delete(&self, category: &str, key: &str) -> BroadcasterResult<()> {
        let cache_key = self.build_key(category, key);

        debug!("Cache DELETE: {}", cache_key);

        let mut conn = self.connection.clone();
        let _: () = conn.del(&cache_key).await.map_err(|e| {
            warn!("Redis DELETE failed for {}: {}", cache_key, e);
            BroadcasterError::Cache(e)
        })?;

        Ok(())
    }

    /// Ping Redis to check connection
    pub async fn ping(&self) -> BroadcasterResult<()> {
        let mut conn = self.connection.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("Redis PING failed: {}", e);
                BroadcasterError::Cache(e)
            })?;

        if pong != "PONG" {
            return Err(BroadcasterError::Internal(
                "Unexpected Redis PING response".to_string(),
            ));
        }

        Ok(())
    }
}

/// Cache category constants
pub mod categories {
    /// Resolved DID documents, keyed by transliterated DID
    pub const IDENTITY: &str = "id:";
    /// Feed query entries (hash → query) and named-feed pointers (name → hash)
    pub const FEED: &str = "feed:";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.key_prefix, "psqr:");
        assert_eq!(config.default_ttl, 300);
    }

    #[test]
    fn test_build_key() {
        let config = CacheConfig::default();
        // We can't easily test async without Redis, but we can test key building logic
        let key = format!("{}{}{}", config.key_prefix, categories::IDENTITY, "did!psqr!example.com");
        assert_eq!(key, "psqr:id:did!psqr!example.com");
    }

    #[test]
    fn test_cache_categories() {
        assert_eq!(categories::IDENTITY, "id:");
        assert_eq!(categories::FEED, "feed:");
    }
}
