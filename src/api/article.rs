/// Article lookup and removal endpoints
use crate::{
    api::require_token,
    authz::GrantLevel,
    context::AppContext,
    error::{BroadcasterError, BroadcasterResult},
    jws, validation,
};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

/// Build article routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/article/:info_hash", get(get_article).delete(delete_article))
}

#[derive(Debug, Serialize)]
struct GetArticleResponse {
    data: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct DeleteArticleResponse {
    message: String,
}

/// Fetch a single article by its info hash from the content index
async fn get_article(
    State(ctx): State<AppContext>,
    Path(info_hash): Path<String>,
) -> BroadcasterResult<Json<GetArticleResponse>> {
    validation::validate_info_hash(&info_hash)?;

    let data = ctx
        .index
        .get_document(&ctx.config.index.content_index, &info_hash)
        .await?;

    Ok(Json(GetArticleResponse { data }))
}

/// Remove an article from both the content and feed indices.
///
/// Articles belong to no aggregation, so only network-wide curate access
/// clears the resource check.
async fn delete_article(
    State(ctx): State<AppContext>,
    Path(info_hash): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> BroadcasterResult<Json<DeleteArticleResponse>> {
    validation::validate_info_hash(&info_hash)?;

    let token = require_token(&body)?;
    let unpacked = jws::unpack(token)?;

    if !ctx.verifier.verify(token).await? {
        return Err(BroadcasterError::VerificationFailed(
            "Token does not verify against the signing identity's published keys.".to_string(),
        ));
    }

    let actor = ctx
        .authz
        .authorize_mutation(&unpacked.header.kid, GrantLevel::Curate)
        .await?;
    ctx.authz.require_resource_access(&actor, None).await?;

    ctx.index
        .delete_document(&ctx.config.index.content_index, &info_hash)
        .await?;
    ctx.index
        .delete_document(&ctx.config.index.feed_index, &info_hash)
        .await?;

    info!("Article {} deleted by {}", info_hash, actor.did);

    Ok(Json(DeleteArticleResponse {
        message: format!("Successfully deleted article {}", info_hash),
    }))
}
