/// List storage endpoints
///
/// A list is an opaque signed payload stored verbatim under a curated name.
/// Each list is backed by an aggregation record in the grant database, which
/// is what scoped (non-network) grants pair against.
use crate::{
    api::require_token,
    authz::GrantLevel,
    context::AppContext,
    error::{BroadcasterError, BroadcasterResult},
    jws, validation,
};
use axum::{
    extract::{Path, State},
    routing::put,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

/// Build list routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/list/:list_name", put(put_list).delete(delete_list))
}

#[derive(Debug, Serialize)]
struct PutListResponse {
    list: String,
}

#[derive(Debug, Serialize)]
struct DeleteListResponse {
    response: String,
}

/// Create or replace a list from a signed payload.
///
/// The payload is stored exactly as signed. Replacing an existing list
/// requires access to its aggregation; a fresh name registers one, pairing
/// the actor with it unless their grant is network-wide.
async fn put_list(
    State(ctx): State<AppContext>,
    Path(list_name): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> BroadcasterResult<Json<PutListResponse>> {
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

    validation::validate_list_name(&list_name)?;

    if ctx.list_store.get(&list_name).await?.is_some() {
        let aggregation = ctx
            .grants
            .find_aggregation(&list_name)
            .await?
            .ok_or_else(|| {
                BroadcasterError::NotFound(format!("List '{}' does not exist.", list_name))
            })?;

        ctx.authz
            .require_resource_access(&actor, Some(aggregation.id))
            .await?;
    } else {
        ctx.grants
            .register_list(&list_name, &actor.grant, &actor.kid)
            .await?;
    }

    ctx.list_store
        .put(&list_name, &unpacked.raw_payload)
        .await?;

    info!("List '{}' saved by {}", list_name, actor.did);

    Ok(Json(PutListResponse { list: list_name }))
}

/// Delete a list: its file, its aggregation record, and every grant pairing
/// scoped to it.
async fn delete_list(
    State(ctx): State<AppContext>,
    Path(list_name): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> BroadcasterResult<Json<DeleteListResponse>> {
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

    validation::validate_list_name(&list_name)?;

    if ctx.list_store.get(&list_name).await?.is_none() {
        return Err(BroadcasterError::NotFound(format!(
            "List file for '{}' does not exist.",
            list_name
        )));
    }

    let aggregation = ctx
        .grants
        .find_aggregation(&list_name)
        .await?
        .ok_or_else(|| {
            BroadcasterError::NotFound(format!("List '{}' does not exist.", list_name))
        })?;

    ctx.authz
        .require_resource_access(&actor, Some(aggregation.id))
        .await?;

    ctx.list_store.delete(&list_name).await?;
    ctx.grants.delete_aggregation(aggregation.id).await?;

    info!("List '{}' deleted by {}", list_name, actor.did);

    Ok(Json(DeleteListResponse {
        response: "File Successfully Deleted.".to_string(),
    }))
}
