/// API routes and handlers
pub mod admin;
pub mod article;
pub mod broadcast;
pub mod feed;
pub mod identity;
pub mod list;
pub mod permission;
pub mod publisher;
pub mod search;

use crate::context::AppContext;
use crate::error::{BroadcasterError, BroadcasterResult};
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(feed::routes())
        .merge(list::routes())
        .merge(identity::routes())
        .merge(article::routes())
        .merge(broadcast::routes())
        .merge(search::routes())
        .merge(permission::routes())
        .merge(publisher::routes())
        .merge(admin::routes())
}

/// Pull the signature token out of a request body. Every signed operation
/// sends `{"token": "<compact JWS>"}` alongside its other fields.
pub(crate) fn require_token(body: &serde_json::Value) -> BroadcasterResult<&str> {
    body.get("token").and_then(|t| t.as_str()).ok_or_else(|| {
        BroadcasterError::Validation("Request body does not contain a token property.".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_token() {
        let body = serde_json::json!({"token": "a.b.c", "dids": []});
        assert_eq!(require_token(&body).unwrap(), "a.b.c");

        assert!(require_token(&serde_json::json!({})).is_err());
        // a token that is not a string is as missing as no token at all
        assert!(require_token(&serde_json::json!({"token": 17})).is_err());
    }
}
