/// Request input validation
///
/// Small, pure checks applied at the API boundary before any storage or
/// index work happens.
use crate::error::{BroadcasterError, BroadcasterResult};

/// Characters that cannot appear in a list name, since the name becomes a
/// directory under the list store.
const FORBIDDEN_LIST_CHARS: &[char] = &['\\', '/', '?', '%', '*', ':', '|', '"', '<', '>'];

/// An info hash is the SHA-1 content address of an article: exactly 40 hex
/// digits, case-insensitive.
pub fn is_info_hash(value: &str) -> bool {
    value.len() == 40 && value.chars().all(|c| c.is_ascii_hexdigit())
}

pub fn validate_info_hash(info_hash: &str) -> BroadcasterResult<()> {
    if !is_info_hash(info_hash) {
        return Err(BroadcasterError::Validation(
            "Infohash provided is not a valid SHA-1.".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_list_name(name: &str) -> BroadcasterResult<()> {
    // "." and ".." would resolve as directory references under the list store
    if name.is_empty() || name == "." || name == ".." || name.contains(FORBIDDEN_LIST_CHARS) {
        return Err(BroadcasterError::Validation(
            "Listname contains invalid characters.".to_string(),
        ));
    }

    Ok(())
}

/// A feedname is dash-separated alphanumeric groups, 32 characters max:
/// no leading, trailing, or doubled dashes.
pub fn validate_feed_name(name: &str) -> BroadcasterResult<()> {
    let well_formed = !name.is_empty()
        && name.len() <= 32
        && name
            .split('-')
            .all(|group| !group.is_empty() && group.chars().all(|c| c.is_ascii_alphanumeric()));

    if !well_formed {
        return Err(BroadcasterError::Validation(
            "Feedname must be alphanumeric and 32 characters max.".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_hash_accepts_both_cases() {
        validate_info_hash("0123456789abcdef0123456789abcdef01234567").unwrap();
        validate_info_hash("0123456789ABCDEF0123456789ABCDEF01234567").unwrap();
    }

    #[test]
    fn test_info_hash_rejects_wrong_length() {
        assert!(validate_info_hash("abc123").is_err());
        assert!(validate_info_hash(&"a".repeat(41)).is_err());
        assert!(validate_info_hash("").is_err());
    }

    #[test]
    fn test_info_hash_rejects_non_hex() {
        assert!(validate_info_hash(&"g".repeat(40)).is_err());
    }

    #[test]
    fn test_list_name_rejects_path_characters() {
        for name in ["a/b", "a\\b", "a:b", "a*b", "a?b", "a%b", "a|b", "a\"b", "a<b", "a>b"] {
            assert!(validate_list_name(name).is_err(), "{} should be rejected", name);
        }
    }

    #[test]
    fn test_list_name_rejects_dot_segments() {
        assert!(validate_list_name(".").is_err());
        assert!(validate_list_name("..").is_err());
    }

    #[test]
    fn test_list_name_accepts_plain_names() {
        validate_list_name("reading-list").unwrap();
        validate_list_name("Favorites 2024").unwrap();
        validate_list_name(".hidden").unwrap();
    }

    #[test]
    fn test_feed_name_accepts_dash_separated_groups() {
        validate_feed_name("news").unwrap();
        validate_feed_name("breaking-news-2024").unwrap();
        validate_feed_name("A1-b2").unwrap();
    }

    #[test]
    fn test_feed_name_rejects_stray_dashes() {
        assert!(validate_feed_name("-news").is_err());
        assert!(validate_feed_name("news-").is_err());
        assert!(validate_feed_name("break--ing").is_err());
    }

    #[test]
    fn test_feed_name_rejects_other_characters() {
        assert!(validate_feed_name("daily news").is_err());
        assert!(validate_feed_name("news!").is_err());
        assert!(validate_feed_name("").is_err());
    }

    #[test]
    fn test_feed_name_rejects_over_32_chars() {
        validate_feed_name(&"a".repeat(32)).unwrap();
        assert!(validate_feed_name(&"a".repeat(33)).is_err());
    }
}
