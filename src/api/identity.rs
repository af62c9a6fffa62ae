/// Hosted identity record endpoints
///
/// Identity records answer to themselves: the governing document's own
/// permission rules decide who may write it, so a brand-new identity can
/// vouch for itself while updates answer to the keys already on file.
use crate::{
    api::require_token,
    authz,
    context::AppContext,
    error::{BroadcasterError, BroadcasterResult},
    jws,
};
use axum::{
    extract::{Path, State},
    routing::put,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

/// Build identity routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/identity/*did", put(put_identity).delete(delete_identity))
}

#[derive(Debug, Serialize)]
struct PutIdentityResponse {
    did: String,
}

#[derive(Debug, Serialize)]
struct DeleteIdentityResponse {
    did: String,
    response: String,
}

/// Create or update a hosted identity record.
///
/// The signed payload is the record. The stored document governs updates;
/// on first creation the payload's own permission rules are consulted
/// instead, since there is nothing else to ask.
async fn put_identity(
    State(ctx): State<AppContext>,
    Path(did): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> BroadcasterResult<Json<PutIdentityResponse>> {
    let existing = ctx.identity_store.get(&did).await?;

    let token = require_token(&body)?;
    let unpacked = jws::unpack(token)?;

    let governing = match &existing {
        Some(raw) => serde_json::from_str(raw).map_err(|e| {
            BroadcasterError::Internal(format!("Stored identity record is unreadable: {}", e))
        })?,
        None => unpacked.payload.clone(),
    };

    authz::authorize_identity_record(token, &unpacked.header.kid, &governing, "admin")?;

    let document = serde_json::to_string(&unpacked.payload).map_err(|e| {
        BroadcasterError::Internal(format!("Failed to serialize identity record: {}", e))
    })?;
    ctx.identity_store.put(&did, &document).await?;

    // any cached resolution of this identity is now stale
    ctx.identity_resolver.invalidate(&did).await?;

    info!("Identity record for {} saved", did);

    Ok(Json(PutIdentityResponse { did }))
}

/// Delete a hosted identity record, honoring the stored document's own
/// permission rules.
async fn delete_identity(
    State(ctx): State<AppContext>,
    Path(did): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> BroadcasterResult<Json<DeleteIdentityResponse>> {
    let existing = ctx.identity_store.get(&did).await?.ok_or_else(|| {
        BroadcasterError::NotFound(format!("Identity record for {} does not exist.", did))
    })?;

    let token = require_token(&body)?;
    let unpacked = jws::unpack(token)?;

    let governing = serde_json::from_str(&existing).map_err(|e| {
        BroadcasterError::Internal(format!("Stored identity record is unreadable: {}", e))
    })?;

    authz::authorize_identity_record(token, &unpacked.header.kid, &governing, "admin")?;

    ctx.identity_store.delete(&did).await?;
    ctx.identity_resolver.invalidate(&did).await?;

    info!("Identity record for {} deleted", did);

    Ok(Json(DeleteIdentityResponse {
        did,
        response: "File Successfully Deleted.".to_string(),
    }))
}
