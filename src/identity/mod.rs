/// PSQR Identity System
///
/// A PSQR DID doubles as a fetch location: the method-specific identifier
/// encodes the HTTPS origin the identity document is served from. This
/// module covers DID syntax and cache-key transliteration, the typed
/// `psqr` document section, and network resolution with caching.

pub mod did;
pub mod resolver;

pub use resolver::IdentityResolver;

use serde::{Deserialize, Serialize};

/// A resolved PSQR identity document.
///
/// Only `id` and the `psqr` section are interpreted here; the JSON-LD
/// context is carried through for display endpoints but never parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DidDocument {
    /// JSON-LD context the document was published with
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    /// The DID this document describes
    pub id: String,
    /// Keys, permission rules, and display metadata
    pub psqr: PsqrSection,
}

/// The `psqr` section of an identity document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsqrSection {
    /// Display metadata published by the identity owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_identity: Option<PublicIdentity>,
    /// Published signing keys; tokens must match one of these by exact kid
    #[serde(default)]
    pub public_keys: Vec<PublicKeyEntry>,
    /// Grant rules governing the identity document itself
    #[serde(default)]
    pub permissions: Vec<PermissionRule>,
}

/// A published EC signing key in JWK form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyEntry {
    /// Full key id, `{did}#{key-name}`
    pub kid: String,
    /// Signing algorithm; `ES384` network-wide
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Key type, `EC`
    pub kty: String,
    /// Curve, `P-384`
    pub crv: String,
    /// Base64url X coordinate
    pub x: String,
    /// Base64url Y coordinate
    pub y: String,
}

/// One grant rule: a key id and the grant names it holds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRule {
    pub kid: String,
    #[serde(default)]
    pub grant: Vec<String>,
}

/// Display metadata for a publisher identity. `name` is the only field
/// interpreted here; everything else is carried through verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicIdentity {
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DidDocument {
    /// Find the published key whose kid matches exactly.
    pub fn find_key(&self, kid: &str) -> Option<&PublicKeyEntry> {
        self.psqr.public_keys.iter().find(|k| k.kid == kid)
    }

    /// Whether the document's own permission rules give `kid` the named grant.
    pub fn kid_holds_grant(&self, kid: &str, grant_name: &str) -> bool {
        self.psqr
            .permissions
            .iter()
            .any(|rule| rule.kid == kid && rule.grant.iter().any(|g| g == grant_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> DidDocument {
        serde_json::from_value(serde_json::json!({
            "@context": "https://vpsqr.com/ns/did-psqr/v1",
            "id": "did:psqr:example.com/u/alice",
            "psqr": {
                "publicIdentity": {
                    "name": "Alice Example",
                    "url": "https://example.com/u/alice"
                },
                "publicKeys": [
                    {
                        "kty": "EC",
                        "crv": "P-384",
                        "x": "xcoord",
                        "y": "ycoord",
                        "kid": "did:psqr:example.com/u/alice#publish",
                        "alg": "ES384"
                    }
                ],
                "permissions": [
                    {
                        "kid": "did:psqr:example.com/u/alice#publish",
                        "grant": ["publish"]
                    },
                    {
                        "kid": "did:psqr:example.com/u/alice#admin",
                        "grant": ["admin", "curate", "publish"]
                    }
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_full_document() {
        let doc = sample_doc();
        assert_eq!(doc.id, "did:psqr:example.com/u/alice");
        assert_eq!(
            doc.context.as_ref().and_then(|c| c.as_str()),
            Some("https://vpsqr.com/ns/did-psqr/v1")
        );
        assert_eq!(doc.psqr.public_keys.len(), 1);
        assert_eq!(doc.psqr.permissions.len(), 2);

        let identity = doc.psqr.public_identity.as_ref().unwrap();
        assert_eq!(identity.name, "Alice Example");
        // unrecognized identity fields survive a round trip
        assert_eq!(
            identity.extra.get("url").and_then(|v| v.as_str()),
            Some("https://example.com/u/alice")
        );
    }

    #[test]
    fn test_find_key_is_exact_match() {
        let doc = sample_doc();
        assert!(doc
            .find_key("did:psqr:example.com/u/alice#publish")
            .is_some());
        // a different key name under the same DID does not match
        assert!(doc.find_key("did:psqr:example.com/u/alice#admin").is_none());
        assert!(doc.find_key("did:psqr:other.com#publish").is_none());
    }

    #[test]
    fn test_kid_holds_grant() {
        let doc = sample_doc();
        let admin_kid = "did:psqr:example.com/u/alice#admin";
        assert!(doc.kid_holds_grant(admin_kid, "admin"));
        assert!(doc.kid_holds_grant(admin_kid, "curate"));
        assert!(!doc.kid_holds_grant("did:psqr:example.com/u/alice#publish", "admin"));
        assert!(!doc.kid_holds_grant("did:psqr:unknown.com#admin", "admin"));
    }

    #[test]
    fn test_sections_default_when_absent() {
        let doc: DidDocument = serde_json::from_value(serde_json::json!({
            "id": "did:psqr:example.com",
            "psqr": {}
        }))
        .unwrap();
        assert!(doc.psqr.public_keys.is_empty());
        assert!(doc.psqr.permissions.is_empty());
        assert!(doc.psqr.public_identity.is_none());
    }
}
