/// Grant listing endpoint
use crate::{
    api::require_token,
    authz::GrantListing,
    context::AppContext,
    error::{BroadcasterError, BroadcasterResult},
    identity::did,
    jws,
};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

/// Build permission routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/permission", get(get_permissions))
}

#[derive(Debug, Serialize)]
struct PermissionsResponse {
    permissions: Vec<GrantListing>,
}

/// List every grant stored for the signing DID
async fn get_permissions(
    State(ctx): State<AppContext>,
    Json(body): Json<serde_json::Value>,
) -> BroadcasterResult<Json<PermissionsResponse>> {
    let token = require_token(&body)?;
    let unpacked = jws::unpack(token)?;

    if !ctx.verifier.verify(token).await? {
        return Err(BroadcasterError::VerificationFailed(
            "Token does not verify against the signing identity's published keys.".to_string(),
        ));
    }

    let (actor_did, _) = did::split_kid(&unpacked.header.kid);

    let permissions = ctx.grants.list_for_did(actor_did).await?;
    if permissions.is_empty() {
        return Err(BroadcasterError::NoGrantRecord(format!(
            "no grants stored for {}",
            actor_did
        )));
    }

    Ok(Json(PermissionsResponse { permissions }))
}
