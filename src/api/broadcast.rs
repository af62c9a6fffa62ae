/// Broadcast ingestion endpoint
use crate::{
    api::require_token,
    context::AppContext,
    error::{BroadcasterError, BroadcasterResult},
    jws, validation,
};
use axum::{
    extract::{Path, State},
    routing::put,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

/// Build broadcast routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/broadcast/:info_hash", put(put_broadcast))
}

#[derive(Debug, Serialize)]
struct BroadcastResponse {
    content: serde_json::Value,
}

/// Accept a signed broadcast and append it to the content journal.
///
/// The signature must verify against the signing identity's published keys;
/// a broadcast is taken at a publisher's word only once the cryptography
/// checks out.
async fn put_broadcast(
    State(ctx): State<AppContext>,
    Path(info_hash): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> BroadcasterResult<Json<BroadcastResponse>> {
    validation::validate_info_hash(&info_hash)?;

    let token = require_token(&body)?;
    let unpacked = jws::unpack(token)?;

    if !ctx.verifier.verify(token).await? {
        return Err(BroadcasterError::VerificationFailed(
            "Token does not verify against the signing identity's published keys.".to_string(),
        ));
    }

    ctx.journal
        .append(&info_hash, &unpacked.payload, Utc::now())
        .await?;

    info!(
        "Broadcast {} journaled for {}",
        info_hash, unpacked.header.kid
    );

    Ok(Json(BroadcastResponse {
        content: unpacked.payload,
    }))
}
