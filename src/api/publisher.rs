/// Publisher information endpoint
use crate::{context::AppContext, error::BroadcasterResult};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

/// Build publisher routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/publisher/*did", get(get_publisher))
}

#[derive(Debug, Serialize)]
struct PublisherResponse {
    data: PublisherData,
}

/// Display payload for a publisher: the document's identity metadata plus
/// every distinct grant level its permission rules hand out
#[derive(Debug, Serialize)]
struct PublisherData {
    context: serde_json::Value,
    id: String,
    name: String,
    url: String,
    updated: serde_json::Value,
    rights: Vec<String>,
}

/// Resolve a publisher DID and collate the rights its document grants
async fn get_publisher(
    State(ctx): State<AppContext>,
    Path(did): Path<String>,
) -> BroadcasterResult<Json<PublisherResponse>> {
    let doc = ctx.identity_resolver.resolve(&did).await?;

    let mut rights: Vec<String> = Vec::new();
    for rule in &doc.psqr.permissions {
        for grant in &rule.grant {
            if !rights.contains(grant) {
                rights.push(grant.clone());
            }
        }
    }

    let (name, url, updated) = match &doc.psqr.public_identity {
        Some(identity) => (
            identity.name.clone(),
            identity
                .extra
                .get("url")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            identity
                .extra
                .get("updated")
                .cloned()
                .unwrap_or(serde_json::Value::Null),
        ),
        None => (String::new(), String::new(), serde_json::Value::Null),
    };

    Ok(Json(PublisherResponse {
        data: PublisherData {
            context: doc.context.unwrap_or(serde_json::Value::Null),
            id: doc.id,
            name,
            url,
            updated,
            rights,
        },
    }))
}
