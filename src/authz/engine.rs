/// Authorization rules for signed mutations
use crate::{
    authz::grants::{Grant, GrantLevel, GrantStore},
    error::{BroadcasterError, BroadcasterResult},
    identity::{did, DidDocument},
    jws,
};

/// An actor that has cleared the grant checks for a mutation
#[derive(Debug, Clone)]
pub struct ActorGrant {
    pub did: String,
    pub kid: String,
    pub grant: Grant,
}

/// Walks the grant rules, in order, each failing closed.
#[derive(Clone)]
pub struct AuthzEngine {
    grants: GrantStore,
}

impl AuthzEngine {
    pub fn new(grants: GrantStore) -> Self {
        Self { grants }
    }

    /// Checks every signed mutation must pass before touching a resource:
    ///
    /// 1. the KID must name a `curate` or `admin` key; a `publish` key can
    ///    sign content but never mutate the broadcaster
    /// 2. the signing DID must hold a stored grant
    /// 3. a grant that pins a KID only accepts that exact KID
    /// 4. the stored level must satisfy `required`
    pub async fn authorize_mutation(
        &self,
        kid: &str,
        required: GrantLevel,
    ) -> BroadcasterResult<ActorGrant> {
        let (actor_did, key_name) = did::split_kid(kid);

        match key_name {
            Some("curate") | Some("admin") => {}
            _ => {
                return Err(BroadcasterError::InsufficientGrant(
                    "signing key does not carry curate or admin authority".to_string(),
                ))
            }
        }

        let grant = self.grants.find_by_did(actor_did).await?.ok_or_else(|| {
            BroadcasterError::NoGrantRecord(format!("no grant stored for {}", actor_did))
        })?;

        if let Some(pinned) = &grant.kid {
            if pinned != kid {
                return Err(BroadcasterError::KidMismatch(
                    "presented KID does not match the granted one".to_string(),
                ));
            }
        }

        if !grant.level.can_act_as(required) {
            return Err(BroadcasterError::InsufficientGrant(format!(
                "operation requires {} access",
                required.as_str()
            )));
        }

        Ok(ActorGrant {
            did: actor_did.to_string(),
            kid: kid.to_string(),
            grant,
        })
    }

    /// The resource-scoping rule: network-wide access passes outright,
    /// otherwise the actor needs a grant pairing with the target
    /// aggregation. A resource with no aggregation accepts network actors
    /// only.
    pub async fn require_resource_access(
        &self,
        actor: &ActorGrant,
        aggregation_id: Option<i64>,
    ) -> BroadcasterResult<()> {
        if actor.grant.has_network_access() {
            return Ok(());
        }

        if let Some(id) = aggregation_id {
            if self.grants.find_pairing(&actor.did, id).await?.is_some() {
                return Ok(());
            }
        }

        Err(BroadcasterError::ResourceAccessDenied(
            "you have not been granted access to this resource".to_string(),
        ))
    }
}

/// The self-sovereign rule for identity records: the target document's own
/// permission rules must give the signing KID `required_name`, and the token
/// must verify against the same document's published keys.
///
/// On first creation `document` is the payload being written, so a new
/// identity vouches for itself; afterwards it is the stored record, so
/// existing keys govern updates.
pub fn authorize_identity_record(
    token: &str,
    kid: &str,
    document: &serde_json::Value,
    required_name: &str,
) -> BroadcasterResult<()> {
    if document.pointer("/psqr/permissions").is_none() {
        return Err(BroadcasterError::Validation(
            "identity record is missing its permission rules".to_string(),
        ));
    }

    let doc: DidDocument = serde_json::from_value(document.clone())
        .map_err(|e| BroadcasterError::Validation(format!("unreadable identity record: {}", e)))?;

    if !doc.kid_holds_grant(kid, required_name) {
        return Err(BroadcasterError::ResourceAccessDenied(
            "identity record does not authorize this key".to_string(),
        ));
    }

    if !jws::verify_with_keys(token, &doc.psqr.public_keys)? {
        return Err(BroadcasterError::VerificationFailed(
            "token does not verify against the identity record's keys".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::grants::tests::{seed_grant, test_grant_db};
    use crate::jws::testing::{sign, test_key_entry};

    const ALICE: &str = "did:psqr:example.com/u/alice";

    #[tokio::test]
    async fn test_publish_key_cannot_mutate() {
        let db = test_grant_db().await;
        seed_grant(&db, ALICE, GrantLevel::Admin, Some(true), None).await;

        let engine = AuthzEngine::new(GrantStore::new(db));
        let result = engine
            .authorize_mutation(&format!("{}#publish", ALICE), GrantLevel::Curate)
            .await;

        assert!(matches!(
            result,
            Err(BroadcasterError::InsufficientGrant(_))
        ));
    }

    #[tokio::test]
    async fn test_kid_without_key_name_cannot_mutate() {
        let db = test_grant_db().await;
        seed_grant(&db, ALICE, GrantLevel::Admin, Some(true), None).await;

        let engine = AuthzEngine::new(GrantStore::new(db));
        let result = engine.authorize_mutation(ALICE, GrantLevel::Curate).await;

        assert!(matches!(
            result,
            Err(BroadcasterError::InsufficientGrant(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_grant_record() {
        let db = test_grant_db().await;

        let engine = AuthzEngine::new(GrantStore::new(db));
        let result = engine
            .authorize_mutation(&format!("{}#curate", ALICE), GrantLevel::Curate)
            .await;

        assert!(matches!(result, Err(BroadcasterError::NoGrantRecord(_))));
    }

    #[tokio::test]
    async fn test_pinned_kid_must_match() {
        let db = test_grant_db().await;
        seed_grant(
            &db,
            ALICE,
            GrantLevel::Curate,
            Some(true),
            Some("did:psqr:example.com/u/alice#admin"),
        )
        .await;

        let engine = AuthzEngine::new(GrantStore::new(db));
        let result = engine
            .authorize_mutation(&format!("{}#curate", ALICE), GrantLevel::Curate)
            .await;

        assert!(matches!(result, Err(BroadcasterError::KidMismatch(_))));
    }

    #[tokio::test]
    async fn test_stored_level_must_satisfy_requirement() {
        let db = test_grant_db().await;
        // the key is named curate but the stored grant only allows publish
        seed_grant(&db, ALICE, GrantLevel::Publish, Some(true), None).await;

        let engine = AuthzEngine::new(GrantStore::new(db));
        let result = engine
            .authorize_mutation(&format!("{}#curate", ALICE), GrantLevel::Curate)
            .await;

        assert!(matches!(
            result,
            Err(BroadcasterError::InsufficientGrant(_))
        ));
    }

    #[tokio::test]
    async fn test_authorize_mutation_happy_path() {
        let db = test_grant_db().await;
        seed_grant(&db, ALICE, GrantLevel::Admin, Some(true), None).await;

        let engine = AuthzEngine::new(GrantStore::new(db));
        let actor = engine
            .authorize_mutation(&format!("{}#admin", ALICE), GrantLevel::Curate)
            .await
            .unwrap();

        assert_eq!(actor.did, ALICE);
        assert_eq!(actor.grant.level, GrantLevel::Admin);
    }

    #[tokio::test]
    async fn test_network_access_covers_any_resource() {
        let db = test_grant_db().await;
        seed_grant(&db, ALICE, GrantLevel::Curate, Some(true), None).await;

        let engine = AuthzEngine::new(GrantStore::new(db));
        let actor = engine
            .authorize_mutation(&format!("{}#curate", ALICE), GrantLevel::Curate)
            .await
            .unwrap();

        engine.require_resource_access(&actor, None).await.unwrap();
        engine
            .require_resource_access(&actor, Some(42))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_scoped_actor_needs_a_pairing() {
        let db = test_grant_db().await;
        seed_grant(&db, ALICE, GrantLevel::Curate, Some(false), None).await;

        let store = GrantStore::new(db);
        let engine = AuthzEngine::new(store.clone());
        let actor = engine
            .authorize_mutation(&format!("{}#curate", ALICE), GrantLevel::Curate)
            .await
            .unwrap();

        // no pairing yet
        assert!(matches!(
            engine.require_resource_access(&actor, Some(1)).await,
            Err(BroadcasterError::ResourceAccessDenied(_))
        ));
        assert!(matches!(
            engine.require_resource_access(&actor, None).await,
            Err(BroadcasterError::ResourceAccessDenied(_))
        ));

        // pairing grants access to that aggregation
        let aggregation = store
            .register_list("paired-list", &actor.grant, &actor.kid)
            .await
            .unwrap();
        engine
            .require_resource_access(&actor, Some(aggregation.id))
            .await
            .unwrap();
    }

    fn identity_record(kid: &str, grants: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "id": "did:psqr:example.com/u/tester",
            "psqr": {
                "publicKeys": [test_key_entry(kid)],
                "permissions": [{"kid": kid, "grant": grants}]
            }
        })
    }

    #[test]
    fn test_identity_record_self_authorization() {
        let kid = "did:psqr:example.com/u/tester#admin";
        let doc = identity_record(kid, &["admin"]);
        let token = sign(kid, &doc);

        authorize_identity_record(&token, kid, &doc, "admin").unwrap();
    }

    #[test]
    fn test_identity_record_requires_permission_rules() {
        let kid = "did:psqr:example.com/u/tester#admin";
        let doc = serde_json::json!({
            "id": "did:psqr:example.com/u/tester",
            "psqr": {"publicKeys": [test_key_entry(kid)]}
        });
        let token = sign(kid, &doc);

        assert!(matches!(
            authorize_identity_record(&token, kid, &doc, "admin"),
            Err(BroadcasterError::Validation(_))
        ));
    }

    #[test]
    fn test_identity_record_rejects_unlisted_grant() {
        let kid = "did:psqr:example.com/u/tester#publish";
        let doc = identity_record(kid, &["publish"]);
        let token = sign(kid, &doc);

        assert!(matches!(
            authorize_identity_record(&token, kid, &doc, "admin"),
            Err(BroadcasterError::ResourceAccessDenied(_))
        ));
    }

    #[test]
    fn test_identity_record_rejects_bad_signature() {
        let kid = "did:psqr:example.com/u/tester#admin";
        let doc = identity_record(kid, &["admin"]);
        let token = sign(kid, &doc);

        // swap the signature for one over different content
        let other = sign(kid, &serde_json::json!({"forged": true}));
        let forged = format!(
            "{}.{}",
            token.rsplit_once('.').unwrap().0,
            other.rsplit_once('.').unwrap().1
        );

        assert!(matches!(
            authorize_identity_record(&forged, kid, &doc, "admin"),
            Err(BroadcasterError::VerificationFailed(_))
        ));
    }
}
