//! UUID Utility Library
//!
//! Identifier handling shared by the watch service.
//!
//! `Uuid::parse_str` is lenient: it accepts braced, URN and un-hyphenated
//! forms and any version nibble. Identifiers that arrive from share links
//! and route parameters must be in the canonical hyphenated form, so this
//! crate checks the grammar first and only then hands the string to `uuid`.
//!
//! ```
//! use uuid_utils::{is_canonical_uuid, parse_uuid};
//!
//! assert!(is_canonical_uuid("550e8400-e29b-41d4-a716-446655440000"));
//! assert!(!is_canonical_uuid("{550e8400-e29b-41d4-a716-446655440000}"));
//!
//! let err = parse_uuid("not-a-uuid", "channel_id").unwrap_err();
//! assert!(err.to_string().contains("channel_id"));
//! ```

use thiserror::Error;
use uuid::Uuid;

/// Length of the canonical `8-4-4-4-12` representation
pub const CANONICAL_LEN: usize = 36;

const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];
const VERSION_POSITION: usize = 14;
const VARIANT_POSITION: usize = 19;

// ============================================================================
// Error Types
// ============================================================================

/// Error type for UUID parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UuidError {
    #[error("Invalid UUID for field '{field}': {details}")]
    InvalidFormat { field: String, details: String },

    #[error("Missing required UUID field: {field}")]
    MissingField { field: String },
}

// ============================================================================
// Grammar
// ============================================================================

/// Check the canonical hyphenated grammar without allocating.
///
/// Hex digits are case-insensitive. The version nibble must be 1-5 and the
/// variant nibble one of `8 9 a b` (RFC 4122 variant).
pub fn is_canonical_uuid(input: &str) -> bool {
    grammar_violation(input).is_none()
}

fn grammar_violation(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    if bytes.len() != CANONICAL_LEN {
        return Some(format!(
            "expected {} characters, found {}",
            CANONICAL_LEN,
            bytes.len()
        ));
    }

    for (idx, byte) in bytes.iter().enumerate() {
        if HYPHEN_POSITIONS.contains(&idx) {
            if *byte != b'-' {
                return Some(format!("expected '-' at position {}", idx));
            }
        } else if !byte.is_ascii_hexdigit() {
            return Some(format!("invalid hex character at position {}", idx));
        }
    }

    if !matches!(bytes[VERSION_POSITION], b'1'..=b'5') {
        return Some("unsupported version nibble".to_string());
    }

    if !matches!(
        bytes[VARIANT_POSITION].to_ascii_lowercase(),
        b'8' | b'9' | b'a' | b'b'
    ) {
        return Some("unsupported variant nibble".to_string());
    }

    None
}

// ============================================================================
// Core Parsing Functions
// ============================================================================

/// Parse a canonical UUID from string with field name for error context
///
/// # Examples
///
/// ```
/// use uuid_utils::parse_uuid;
///
/// let uuid = parse_uuid("550E8400-E29B-41D4-A716-446655440000", "channel_id").unwrap();
/// assert_eq!(uuid.to_string(), "550e8400-e29b-41d4-a716-446655440000");
/// ```
pub fn parse_uuid(input: &str, field: &str) -> Result<Uuid, UuidError> {
    if input.trim().is_empty() {
        return Err(UuidError::MissingField {
            field: field.to_string(),
        });
    }

    if let Some(details) = grammar_violation(input) {
        return Err(UuidError::InvalidFormat {
            field: field.to_string(),
            details,
        });
    }

    Uuid::parse_str(input).map_err(|e| UuidError::InvalidFormat {
        field: field.to_string(),
        details: e.to_string(),
    })
}

/// Parse an optional UUID (returns None if input is missing or blank)
pub fn parse_uuid_opt(input: Option<&str>, field: &str) -> Result<Option<Uuid>, UuidError> {
    match input {
        Some(value) if !value.trim().is_empty() => parse_uuid(value, field).map(Some),
        _ => Ok(None),
    }
}

/// Convert UUID to lowercase hyphenated string (canonical form)
pub fn to_canonical_string(uuid: &Uuid) -> String {
    uuid.as_hyphenated().to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_UUID: &str = "550e8400-e29b-41d4-a716-446655440000";
    const INVALID_UUID: &str = "not-a-uuid";

    #[test]
    fn test_canonical_accepts_mixed_case() {
        assert!(is_canonical_uuid(VALID_UUID));
        assert!(is_canonical_uuid("550E8400-E29B-41D4-A716-446655440000"));
        assert!(is_canonical_uuid("550e8400-E29B-11d4-B716-446655440000"));
    }

    #[test]
    fn test_canonical_rejects_lenient_forms() {
        assert!(!is_canonical_uuid(""));
        assert!(!is_canonical_uuid(INVALID_UUID));
        assert!(!is_canonical_uuid("550e8400e29b41d4a716446655440000"));
        assert!(!is_canonical_uuid("{550e8400-e29b-41d4-a716-446655440000}"));
        assert!(!is_canonical_uuid(
            "urn:uuid:550e8400-e29b-41d4-a716-446655440000"
        ));
        assert!(!is_canonical_uuid(" 550e8400-e29b-41d4-a716-446655440000"));
    }

    #[test]
    fn test_canonical_checks_version_and_variant() {
        // nil uuid has version 0
        assert!(!is_canonical_uuid("00000000-0000-0000-0000-000000000000"));
        // version 6 is outside the accepted range
        assert!(!is_canonical_uuid("550e8400-e29b-61d4-a716-446655440000"));
        // variant nibble 'c' is reserved
        assert!(!is_canonical_uuid("550e8400-e29b-41d4-c716-446655440000"));
        assert!(is_canonical_uuid("550e8400-e29b-51d4-8716-446655440000"));
    }

    #[test]
    fn test_canonical_rejects_misplaced_hyphen() {
        assert!(!is_canonical_uuid("550e840-0e29b-41d4-a716-446655440000"));
        assert!(!is_canonical_uuid("550e8400-e29b-41d4-a716-44665544000g"));
    }

    #[test]
    fn test_parse_uuid_success() {
        let uuid = parse_uuid(VALID_UUID, "test_id").unwrap();
        assert_eq!(uuid.to_string(), VALID_UUID);
    }

    #[test]
    fn test_parse_uuid_failure() {
        let err = parse_uuid(INVALID_UUID, "channel_id").unwrap_err();
        assert!(matches!(err, UuidError::InvalidFormat { .. }));
        assert!(err.to_string().contains("channel_id"));
    }

    #[test]
    fn test_parse_uuid_blank_is_missing() {
        let err = parse_uuid("   ", "channel_id").unwrap_err();
        assert_eq!(
            err,
            UuidError::MissingField {
                field: "channel_id".to_string()
            }
        );
    }

    #[test]
    fn test_parse_uuid_opt() {
        assert_eq!(parse_uuid_opt(None, "optional_id").unwrap(), None);
        assert_eq!(parse_uuid_opt(Some(""), "optional_id").unwrap(), None);
        assert!(parse_uuid_opt(Some(VALID_UUID), "optional_id")
            .unwrap()
            .is_some());
        assert!(parse_uuid_opt(Some(INVALID_UUID), "optional_id").is_err());
    }

    #[test]
    fn test_to_canonical_string() {
        let uuid = Uuid::parse_str(VALID_UUID).unwrap();
        let canonical = to_canonical_string(&uuid);
        assert_eq!(canonical, VALID_UUID);
        assert!(!canonical.contains(char::is_uppercase));
    }

    #[test]
    fn test_generated_ids_are_canonical() {
        assert!(is_canonical_uuid(&Uuid::new_v4().to_string()));
        let v5 = Uuid::new_v5(&Uuid::NAMESPACE_URL, b"host@example.com");
        assert!(is_canonical_uuid(&v5.to_string()));
    }
}
