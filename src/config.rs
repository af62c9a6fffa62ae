/// Configuration management for the PSQR broadcaster
use crate::cache::CacheConfig;
use crate::error::{BroadcasterError, BroadcasterResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub identity: IdentityConfig,
    pub index: IndexConfig,
    pub feed: FeedConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration: grant database plus the on-disk output trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub grant_db: PathBuf,
    pub feed_directory: PathBuf,
    pub list_directory: PathBuf,
    pub content_directory: PathBuf,
    pub search_directory: PathBuf,
}

/// Identity (DID) resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Seconds a resolved DID document stays in the cache store
    pub cache_ttl: u64,
    /// Outbound fetch timeout for DID documents
    pub fetch_timeout_secs: u64,
    /// DID prefixes this broadcaster hosts identity records for, each mapped
    /// to the directory its documents live under
    pub accepted_domains: Vec<IdentityDomain>,
}

/// One hosted DID prefix → storage directory mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityDomain {
    pub prefix: String,
    pub directory: PathBuf,
}

/// Index backend (Elasticsearch) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub feed_index: String,
    pub content_index: String,
    pub timeout_secs: u64,
}

/// Feed pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Seconds a cached feed query entry lives. Required: a deployment
    /// without it must refuse to start rather than pick an unsafe default.
    pub query_ttl_secs: u64,
    /// Public endpoint feed URLs are built against
    pub location_endpoint: String,
    /// Result window for request-driven feed builds
    pub bcf_size: u32,
    /// Result window for operator-created named feeds
    pub named_feed_size: u32,
}

/// Search pagination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub max_per_page: usize,
    pub result_limit: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> BroadcasterResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("PSQR_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("PSQR_PORT")
            .unwrap_or_else(|_| "8160".to_string())
            .parse()
            .map_err(|_| BroadcasterError::Validation("Invalid port number".to_string()))?;
        let version = env::var("PSQR_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let data_directory: PathBuf = env::var("PSQR_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let grant_db = env::var("PSQR_GRANT_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("grants.sqlite"));
        let feed_directory = env::var("PSQR_FEED_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("feed"));
        let list_directory = env::var("PSQR_LIST_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("list"));
        let content_directory = env::var("PSQR_CONTENT_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("broadcast"));
        let search_directory = env::var("PSQR_SEARCH_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("search"));

        let identity_cache_ttl = env::var("PSQR_IDENTITY_CACHE_TTL")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);
        let fetch_timeout_secs = env::var("PSQR_RESOLVER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let accepted_domains = parse_identity_domains(
            &env::var("PSQR_IDENTITY_DOMAINS").unwrap_or_else(|_| String::new()),
        )?;

        let index_url = env::var("PSQR_ES_URL")
            .unwrap_or_else(|_| "https://localhost:9200".to_string());
        let index_username = env::var("PSQR_ES_USERNAME").ok();
        let index_password = env::var("PSQR_ES_PASSWORD").ok();
        let feed_index = env::var("PSQR_FEED_INDEX").unwrap_or_else(|_| "feed".to_string());
        let content_index =
            env::var("PSQR_CONTENT_INDEX").unwrap_or_else(|_| "content".to_string());
        let index_timeout_secs = env::var("PSQR_ES_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        // The feed query TTL has no default on purpose: a deployment that
        // forgot it would otherwise cache forever or not at all.
        let query_ttl_secs = env::var("PSQR_FEED_CACHE_TTL")
            .map_err(|_| {
                BroadcasterError::MisconfiguredTtl(
                    "PSQR_FEED_CACHE_TTL is not set".to_string(),
                )
            })?
            .parse()
            .map_err(|_| {
                BroadcasterError::MisconfiguredTtl(
                    "PSQR_FEED_CACHE_TTL is not a number of seconds".to_string(),
                )
            })?;
        let location_endpoint = env::var("PSQR_FEED_LOCATION_ENDPOINT")
            .unwrap_or_else(|_| format!("https://{}", hostname));
        let bcf_size = env::var("PSQR_BCF_SIZE")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .unwrap_or(100);
        let named_feed_size = env::var("PSQR_NAMED_FEED_SIZE")
            .unwrap_or_else(|_| "500".to_string())
            .parse()
            .unwrap_or(500);

        let max_per_page = env::var("PSQR_SEARCH_MAX_PER_PAGE")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);
        let result_limit = env::var("PSQR_SEARCH_RESULT_LIMIT")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .unwrap_or(1000);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                grant_db,
                feed_directory,
                list_directory,
                content_directory,
                search_directory,
            },
            cache: CacheConfig::from_env(),
            identity: IdentityConfig {
                cache_ttl: identity_cache_ttl,
                fetch_timeout_secs,
                accepted_domains,
            },
            index: IndexConfig {
                url: index_url,
                username: index_username,
                password: index_password,
                feed_index,
                content_index,
                timeout_secs: index_timeout_secs,
            },
            feed: FeedConfig {
                query_ttl_secs,
                location_endpoint,
                bcf_size,
                named_feed_size,
            },
            search: SearchConfig {
                max_per_page,
                result_limit,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> BroadcasterResult<()> {
        if self.service.hostname.is_empty() {
            return Err(BroadcasterError::Validation(
                "Hostname cannot be empty".to_string(),
            ));
        }

        if self.feed.query_ttl_secs == 0 {
            return Err(BroadcasterError::MisconfiguredTtl(
                "Feed query TTL must be greater than zero".to_string(),
            ));
        }

        if self.search.max_per_page == 0 {
            return Err(BroadcasterError::Validation(
                "Search page size must be greater than zero".to_string(),
            ));
        }

        for domain in &self.identity.accepted_domains {
            if !domain.prefix.starts_with("did:") {
                return Err(BroadcasterError::Validation(format!(
                    "Identity domain prefix must be a DID prefix: {}",
                    domain.prefix
                )));
            }
        }

        Ok(())
    }
}

/// Parse `did-prefix=directory` pairs from a comma-separated list
fn parse_identity_domains(raw: &str) -> BroadcasterResult<Vec<IdentityDomain>> {
    let mut domains = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (prefix, directory) = entry.split_once('=').ok_or_else(|| {
            BroadcasterError::Validation(format!(
                "Identity domain entry must be prefix=directory: {}",
                entry
            ))
        })?;

        domains.push(IdentityDomain {
            prefix: prefix.trim().to_string(),
            directory: PathBuf::from(directory.trim()),
        });
    }

    Ok(domains)
}
