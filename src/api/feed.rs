/// Feed build and retrieval endpoints
use crate::{
    context::AppContext,
    error::{BroadcasterError, BroadcasterResult},
    validation,
};
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Build feed routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/feed", put(put_feed))
        .route("/api/feed/*name", get(get_feed))
}

/// Request to build a feed from a set of identities
#[derive(Debug, Deserialize)]
struct PutFeedRequest {
    dids: Vec<String>,
}

/// Response naming where the materialized feed is served from
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PutFeedResponse {
    feed_url: String,
}

/// Contents of a materialized feed
#[derive(Debug, Serialize)]
struct GetFeedResponse {
    feed: Vec<serde_json::Value>,
}

/// Build a feed for a set of DIDs and materialize it under its content hash
async fn put_feed(
    State(ctx): State<AppContext>,
    Json(req): Json<PutFeedRequest>,
) -> BroadcasterResult<Json<PutFeedResponse>> {
    let build = ctx
        .feed_pipeline
        .build_cache_fetch(req.dids, ctx.config.feed.bcf_size)
        .await?;

    ctx.feed_store.write(&build.hash, &build.documents).await?;

    info!("Feed content saved under {}", build.hash);

    Ok(Json(PutFeedResponse {
        feed_url: format!(
            "{}/feed/{}/latest.jsonl",
            ctx.config.feed.location_endpoint, build.hash
        ),
    }))
}

/// Serve a materialized feed by content hash, feed name, or DID.
///
/// A DID with no feed on disk yet gets one built on the spot; a hash or
/// feed name without one is a plain miss.
async fn get_feed(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
) -> BroadcasterResult<Json<GetFeedResponse>> {
    if let Some(feed) = ctx.feed_store.read(&name).await? {
        return Ok(Json(GetFeedResponse { feed }));
    }

    if validation::is_info_hash(&name) || !name.contains("did:") {
        return Err(BroadcasterError::NotFound(
            "Feed with hash or feed name does not exist.".to_string(),
        ));
    }

    let build = ctx
        .feed_pipeline
        .build_cache_fetch(vec![name.clone()], ctx.config.feed.bcf_size)
        .await?;

    ctx.feed_store.write(&name, &build.documents).await?;

    info!("Feed content saved for identity {}", name);

    Ok(Json(GetFeedResponse {
        feed: build.documents,
    }))
}
