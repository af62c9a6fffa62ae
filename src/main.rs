/// PSQR Broadcaster - decentralized content network node
///
/// A Rust implementation of a PSQR broadcaster, serving identity-addressed
/// feeds, curated lists, and signed content for the PSQR network.

mod api;
mod authz;
mod cache;
mod config;
mod context;
mod db;
mod error;
mod feed;
mod identity;
mod index;
mod jws;
mod search;
mod server;
mod storage;
mod validation;

use config::ServerConfig;
use context::AppContext;
use error::BroadcasterResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> BroadcasterResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "psqr_broadcaster=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Print banner
    print_banner();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ____  _____ ____    ____
   / __ \/ ___// __ \  / __ \
  / /_/ /\__ \/ / / / / /_/ /
 / ____/___/ / /_/ / / _, _/
/_/    /____/\___\_\/_/ |_|

        PSQR Broadcaster v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
