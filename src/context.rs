/// Application context and dependency injection
use crate::{
    authz::{AuthzEngine, GrantStore},
    cache::CacheClient,
    config::ServerConfig,
    db,
    error::BroadcasterResult,
    feed::FeedPipeline,
    identity::IdentityResolver,
    index::IndexClient,
    jws::JwsVerifier,
    search::SearchService,
    storage::{BroadcastJournal, FeedStore, IdentityStore, ListStore, PageStore},
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub grant_db: SqlitePool,
    pub cache: CacheClient,
    pub identity_resolver: IdentityResolver,
    pub verifier: JwsVerifier,
    pub grants: GrantStore,
    pub authz: AuthzEngine,
    pub index: IndexClient,
    pub feed_pipeline: FeedPipeline,
    pub search: SearchService,
    // On-disk stores the public web tier serves from
    pub feed_store: FeedStore,
    pub list_store: ListStore,
    pub identity_store: IdentityStore,
    pub journal: BroadcastJournal,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> BroadcasterResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directories if they don't exist
        Self::ensure_directories(&config).await?;

        // Initialize grant database
        let grant_db =
            db::create_pool(&config.storage.grant_db, db::DatabaseOptions::default()).await?;

        // Run migrations and test the connection
        db::run_migrations(&grant_db).await?;
        db::test_connection(&grant_db).await?;

        // Connect the cache store and check it answers
        let cache = CacheClient::new(config.cache.clone()).await?;
        cache.ping().await?;

        // Identity resolution and signature verification
        let identity_resolver = IdentityResolver::new(cache.clone(), &config.identity)?;
        let verifier = JwsVerifier::new(identity_resolver.clone());

        // Grant store and the authorization rules over it
        let grants = GrantStore::new(grant_db.clone());
        let authz = AuthzEngine::new(grants.clone());

        // Search index client, shared by the feed and search pipelines
        let index = IndexClient::new(&config.index)?;
        let feed_pipeline = FeedPipeline::new(cache.clone(), index.clone(), &config);
        let search = SearchService::new(
            index.clone(),
            PageStore::new(config.storage.search_directory.clone()),
            &config,
        );

        // On-disk stores
        let feed_store = FeedStore::new(config.storage.feed_directory.clone());
        let list_store = ListStore::new(config.storage.list_directory.clone());
        let identity_store = IdentityStore::new(config.identity.accepted_domains.clone());
        let journal = BroadcastJournal::new(config.storage.content_directory.clone());

        Ok(Self {
            config: Arc::new(config),
            grant_db,
            cache,
            identity_resolver,
            verifier,
            grants,
            authz,
            index,
            feed_pipeline,
            search,
            feed_store,
            list_store,
            identity_store,
            journal,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> BroadcasterResult<()> {
        let mut dirs = vec![
            &config.storage.data_directory,
            &config.storage.feed_directory,
            &config.storage.list_directory,
            &config.storage.content_directory,
            &config.storage.search_directory,
        ];

        for domain in &config.identity.accepted_domains {
            dirs.push(&domain.directory);
        }

        for dir in dirs {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
