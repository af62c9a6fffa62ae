/// Maintenance endpoints
///
/// Index purges and named-feed creation. Every route here demands a
/// verified admin token with network-wide access; there is no scoped-grant
/// path into maintenance.
use crate::{
    api::require_token,
    authz::{ActorGrant, AggregationKind, GrantLevel},
    context::AppContext,
    error::{BroadcasterError, BroadcasterResult},
    feed::TermValue,
    identity::did,
    index::PurgeOutcome,
    jws, validation,
};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Build maintenance routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/admin/purge", post(purge_articles))
        .route("/api/admin/publisher-content", post(purge_publisher_content))
        .route("/api/admin/feed", post(create_named_feed))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurgeRequest {
    info_hashes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PublisherContentRequest {
    did: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamedFeedRequest {
    feed_name: String,
    dids: Vec<String>,
    size: Option<u32>,
}

/// Per-index deletion report
#[derive(Debug, Serialize)]
struct PurgeResponse {
    content: PurgeOutcome,
    feed: PurgeOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NamedFeedResponse {
    feed_name: String,
    feed_url: String,
}

/// Delete-by-query body matching any of a set of info hashes
#[derive(Debug, Serialize)]
struct InfoHashPurgeQuery {
    query: PurgeBool,
}

#[derive(Debug, Serialize)]
struct PurgeBool {
    #[serde(rename = "bool")]
    clause: PurgeShould,
}

#[derive(Debug, Serialize)]
struct PurgeShould {
    should: Vec<InfoHashTerm>,
}

#[derive(Debug, Serialize)]
struct InfoHashTerm {
    term: InfoHashField,
}

#[derive(Debug, Serialize)]
struct InfoHashField {
    #[serde(rename = "infoHash")]
    info_hash: TermValue,
}

/// Delete-by-query body matching everything a publisher signed
#[derive(Debug, Serialize)]
struct PublisherContentQuery {
    query: IdentityMatch,
}

#[derive(Debug, Serialize)]
struct IdentityMatch {
    #[serde(rename = "match")]
    clause: IdentityField,
}

#[derive(Debug, Serialize)]
struct IdentityField {
    identity: String,
}

/// The admin gate: a verified token signed with the `admin` key whose DID
/// holds a network-wide admin grant, KID pin respected.
async fn require_admin(
    ctx: &AppContext,
    body: &serde_json::Value,
) -> BroadcasterResult<ActorGrant> {
    let token = require_token(body)?;
    let unpacked = jws::unpack(token)?;

    if did::split_kid(&unpacked.header.kid).1 != Some("admin") {
        return Err(BroadcasterError::InsufficientGrant(
            "Maintenance requests must be signed with the admin key.".to_string(),
        ));
    }

    if !ctx.verifier.verify(token).await? {
        return Err(BroadcasterError::VerificationFailed(
            "Token does not verify against the signing identity's published keys.".to_string(),
        ));
    }

    let actor = ctx
        .authz
        .authorize_mutation(&unpacked.header.kid, GrantLevel::Admin)
        .await?;
    ctx.authz.require_resource_access(&actor, None).await?;

    Ok(actor)
}

/// Purge articles from both indices by info hash
async fn purge_articles(
    State(ctx): State<AppContext>,
    Json(body): Json<serde_json::Value>,
) -> BroadcasterResult<Json<PurgeResponse>> {
    let actor = require_admin(&ctx, &body).await?;

    let req: PurgeRequest = serde_json::from_value(body)
        .map_err(|e| BroadcasterError::Validation(format!("Invalid purge request: {}", e)))?;

    // hash lists tend to arrive pasted from elsewhere, stray line breaks
    // and all
    let should = req
        .info_hashes
        .iter()
        .map(|hash| InfoHashTerm {
            term: InfoHashField {
                info_hash: TermValue {
                    value: hash.replace(['\n', '\r'], ""),
                },
            },
        })
        .collect();

    let query = InfoHashPurgeQuery {
        query: PurgeBool {
            clause: PurgeShould { should },
        },
    };

    let feed = ctx
        .index
        .delete_by_query(&ctx.config.index.feed_index, &query)
        .await?;
    let content = ctx
        .index
        .delete_by_query(&ctx.config.index.content_index, &query)
        .await?;

    info!(
        "Deleted {} doc(s) from the '{}' index with {} failure(s), requested by {}",
        content.deleted, ctx.config.index.content_index, content.failures, actor.did
    );
    info!(
        "Deleted {} doc(s) from the '{}' index with {} failure(s), requested by {}",
        feed.deleted, ctx.config.index.feed_index, feed.failures, actor.did
    );

    Ok(Json(PurgeResponse { content, feed }))
}

/// Purge every document a publisher signed from both indices
async fn purge_publisher_content(
    State(ctx): State<AppContext>,
    Json(body): Json<serde_json::Value>,
) -> BroadcasterResult<Json<PurgeResponse>> {
    let actor = require_admin(&ctx, &body).await?;

    let req: PublisherContentRequest = serde_json::from_value(body).map_err(|e| {
        BroadcasterError::Validation(format!("Invalid publisher content request: {}", e))
    })?;

    // only publishers this broadcaster hosts may be purged by DID
    let (domain, _) = did::storage_segments(&req.did)?;
    if !ctx
        .config
        .identity
        .accepted_domains
        .iter()
        .any(|d| d.prefix == domain)
    {
        return Err(BroadcasterError::Validation(
            "This is not an acceptable DID subdomain.".to_string(),
        ));
    }

    let query = PublisherContentQuery {
        query: IdentityMatch {
            clause: IdentityField {
                identity: req.did.clone(),
            },
        },
    };

    let feed = ctx
        .index
        .delete_by_query(&ctx.config.index.feed_index, &query)
        .await?;
    let content = ctx
        .index
        .delete_by_query(&ctx.config.index.content_index, &query)
        .await?;

    info!(
        "Deleted {} doc(s) for publisher {} from the '{}' index with {} failure(s), requested by {}",
        content.deleted, req.did, ctx.config.index.content_index, content.failures, actor.did
    );
    info!(
        "Deleted {} doc(s) for publisher {} from the '{}' index with {} failure(s), requested by {}",
        feed.deleted, req.did, ctx.config.index.feed_index, feed.failures, actor.did
    );

    Ok(Json(PurgeResponse { content, feed }))
}

/// Create a named feed: register its cache entries, record its aggregation,
/// and materialize it on disk
async fn create_named_feed(
    State(ctx): State<AppContext>,
    Json(body): Json<serde_json::Value>,
) -> BroadcasterResult<Json<NamedFeedResponse>> {
    let actor = require_admin(&ctx, &body).await?;

    let req: NamedFeedRequest = serde_json::from_value(body)
        .map_err(|e| BroadcasterError::Validation(format!("Invalid named feed request: {}", e)))?;

    validation::validate_feed_name(&req.feed_name)?;

    let size = req.size.unwrap_or(ctx.config.feed.named_feed_size);
    let build = ctx
        .feed_pipeline
        .register_named_feed(&req.feed_name, req.dids, size)
        .await?;

    ctx.grants
        .ensure_aggregation(&req.feed_name, AggregationKind::Feed)
        .await?;
    ctx.feed_store.write(&req.feed_name, &build.documents).await?;

    info!(
        "Named feed '{}' created with {} document(s) by {}",
        req.feed_name,
        build.documents.len(),
        actor.did
    );

    Ok(Json(NamedFeedResponse {
        feed_url: format!(
            "{}/feed/{}/latest.jsonl",
            ctx.config.feed.location_endpoint, req.feed_name
        ),
        feed_name: req.feed_name,
    }))
}
