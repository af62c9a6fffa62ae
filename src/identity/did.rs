/// PSQR DID syntax
///
/// DIDs look like `did:psqr:{hostname}/{path}` or the equivalent colon form
/// `did:psqr:{hostname}:{path}`. Because `:` and `/` collide with cache key
/// and filesystem conventions, DIDs are transliterated (`:` -> `!`,
/// `/` -> `^`) before being used as keys, which is why those two characters
/// are banned from the DIDs themselves. Everything in this module is a pure
/// function of the input string.

use crate::error::{BroadcasterError, BroadcasterResult};

/// Drop the `#fragment` (key name) from a DID, keeping the first run of
/// non-`#` characters.
pub fn strip_fragment(did: &str) -> &str {
    did.split('#').find(|part| !part.is_empty()).unwrap_or("")
}

/// Split a KID into its owning DID and key name.
///
/// `did:psqr:example.com#admin` -> `("did:psqr:example.com", Some("admin"))`.
/// A KID without a fragment has no key name.
pub fn split_kid(kid: &str) -> (&str, Option<&str>) {
    match kid.find('#') {
        Some(idx) => (&kid[..idx], Some(&kid[idx + 1..])),
        None => (kid, None),
    }
}

/// Transliterate a DID into its cache key form: fragment dropped, `:` -> `!`
/// and `/` -> `^`.
///
/// The mapping is reversible only because `!` and `^` never appear in a
/// valid DID; inputs containing them are rejected outright.
pub fn cache_key(did: &str) -> BroadcasterResult<String> {
    if did.contains('!') || did.contains('^') {
        return Err(BroadcasterError::InvalidDidSyntax(
            "DID cannot contain the characters ! or ^".to_string(),
        ));
    }

    Ok(strip_fragment(did).replace(':', "!").replace('/', "^"))
}

/// Undo [`cache_key`], recovering the bare DID.
pub fn from_cache_key(key: &str) -> String {
    key.replace('!', ":").replace('^', "/")
}

/// Derive the HTTPS URL an identity document is served from, given the
/// transliterated cache key form of its DID.
///
/// The first two segments (`did`, the method) are dropped; what remains is
/// the hostname and path. Colon-form DIDs resolve to a `/.well-known/psqr`
/// document under that path, slash-form DIDs resolve to the path itself:
///
/// - `did!psqr!example.com` -> `https://example.com/.well-known/psqr`
/// - `did!psqr!example.com!u!alice` -> `https://example.com/u/alice/.well-known/psqr`
/// - `did!psqr!example.com^u^alice` -> `https://example.com/u/alice`
pub fn fetch_url(key: &str) -> BroadcasterResult<String> {
    if key.contains(':') || key.contains('/') {
        return Err(BroadcasterError::InvalidDidSyntax(
            "expected the transliterated form of the DID".to_string(),
        ));
    }

    let restored = key.replace('^', "/");
    let segments: Vec<&str> = restored.split('!').filter(|s| !s.is_empty()).collect();

    if segments.len() < 3 {
        return Err(BroadcasterError::InvalidDidSyntax(
            "unable to parse DID, expected did:psqr:{hostname}/{path}".to_string(),
        ));
    }

    let paths = &segments[2..];

    if !paths[0].contains('/') {
        return Ok(format!("https://{}/.well-known/psqr", paths.join("/")));
    }

    Ok(format!("https://{}", paths.join("/")))
}

/// Path segments under the hosting domain, used to place identity records
/// on disk: `did:psqr:example.com:u:alice` and
/// `did:psqr:example.com/u/alice` both yield `["u", "alice"]`.
///
/// Also returns the `did:{method}:{hostname}` prefix the segments hang off,
/// which callers match against the configured accepted domains.
pub fn storage_segments(did: &str) -> BroadcasterResult<(String, Vec<String>)> {
    let bare = strip_fragment(did);
    let colon_parts: Vec<&str> = bare.split(':').filter(|s| !s.is_empty()).collect();

    if colon_parts.len() < 3 {
        return Err(BroadcasterError::InvalidDidSyntax(
            "unable to parse DID, expected did:psqr:{hostname}/{path}".to_string(),
        ));
    }

    let domain = colon_parts[..3].join(":");

    if let Some((prefix, path)) = domain.split_once('/') {
        // slash form: the hostname segment carries the rest of the path
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        return Ok((prefix.to_string(), segments));
    }

    // colon form: everything after the hostname is a path segment
    let segments = colon_parts[3..].iter().map(|s| s.to_string()).collect();
    Ok((domain, segments))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fragment() {
        assert_eq!(
            strip_fragment("did:psqr:example.com#admin"),
            "did:psqr:example.com"
        );
        assert_eq!(strip_fragment("did:psqr:example.com"), "did:psqr:example.com");
        assert_eq!(
            strip_fragment("did:psqr:example.com/u/alice#publish"),
            "did:psqr:example.com/u/alice"
        );
    }

    #[test]
    fn test_split_kid() {
        assert_eq!(
            split_kid("did:psqr:example.com#curate"),
            ("did:psqr:example.com", Some("curate"))
        );
        assert_eq!(split_kid("did:psqr:example.com"), ("did:psqr:example.com", None));
        // only the first # separates the key name
        assert_eq!(split_kid("did:psqr:a#b#c"), ("did:psqr:a", Some("b#c")));
    }

    #[test]
    fn test_cache_key_transliteration() {
        assert_eq!(
            cache_key("did:psqr:example.com:u:alice").unwrap(),
            "did!psqr!example.com!u!alice"
        );
        assert_eq!(
            cache_key("did:psqr:example.com/u/alice").unwrap(),
            "did!psqr!example.com^u^alice"
        );
    }

    #[test]
    fn test_cache_key_drops_fragment() {
        assert_eq!(
            cache_key("did:psqr:example.com/u/alice#publish").unwrap(),
            "did!psqr!example.com^u^alice"
        );
    }

    #[test]
    fn test_cache_key_rejects_reserved_characters() {
        assert!(matches!(
            cache_key("did:psqr:bad!domain"),
            Err(BroadcasterError::InvalidDidSyntax(_))
        ));
        assert!(matches!(
            cache_key("did:psqr:bad^domain"),
            Err(BroadcasterError::InvalidDidSyntax(_))
        ));
    }

    #[test]
    fn test_cache_key_round_trip() {
        let did = "did:psqr:example.com/u/alice";
        assert_eq!(from_cache_key(&cache_key(did).unwrap()), did);
    }

    #[test]
    fn test_fetch_url_colon_form_gets_well_known() {
        assert_eq!(
            fetch_url("did!psqr!example.com!u!alice").unwrap(),
            "https://example.com/u/alice/.well-known/psqr"
        );
    }

    #[test]
    fn test_fetch_url_slash_form_is_direct() {
        assert_eq!(
            fetch_url("did!psqr!example.com^u^alice").unwrap(),
            "https://example.com/u/alice"
        );
    }

    #[test]
    fn test_fetch_url_bare_domain() {
        assert_eq!(
            fetch_url("did!psqr!example.com").unwrap(),
            "https://example.com/.well-known/psqr"
        );
    }

    #[test]
    fn test_fetch_url_rejects_untransliterated_input() {
        assert!(matches!(
            fetch_url("did:psqr:example.com"),
            Err(BroadcasterError::InvalidDidSyntax(_))
        ));
    }

    #[test]
    fn test_fetch_url_rejects_too_few_segments() {
        assert!(matches!(
            fetch_url("did!psqr"),
            Err(BroadcasterError::InvalidDidSyntax(_))
        ));
        assert!(matches!(
            fetch_url("deadbeef^cafe"),
            Err(BroadcasterError::InvalidDidSyntax(_))
        ));
    }

    #[test]
    fn test_storage_segments_colon_form() {
        let (domain, segments) = storage_segments("did:psqr:example.com:u:alice").unwrap();
        assert_eq!(domain, "did:psqr:example.com");
        assert_eq!(segments, vec!["u", "alice"]);
    }

    #[test]
    fn test_storage_segments_slash_form() {
        let (domain, segments) = storage_segments("did:psqr:example.com/u/alice").unwrap();
        assert_eq!(domain, "did:psqr:example.com");
        assert_eq!(segments, vec!["u", "alice"]);
    }

    #[test]
    fn test_storage_segments_bare_domain() {
        let (domain, segments) = storage_segments("did:psqr:example.com").unwrap();
        assert_eq!(domain, "did:psqr:example.com");
        assert!(segments.is_empty());
    }

    #[test]
    fn test_storage_segments_rejects_short_dids() {
        assert!(storage_segments("did:psqr").is_err());
    }
}
