//! Shareable watch links: `{origin}/watch/{channel_id}`

use uuid::Uuid;

const WATCH_SEGMENT: &str = "/watch/";

pub fn share_link(origin: &str, channel_id: Uuid) -> String {
    format!(
        "{}{}{}",
        origin.trim_end_matches('/'),
        WATCH_SEGMENT,
        uuid_utils::to_canonical_string(&channel_id)
    )
}

/// Extract the identifier from a watch link.
///
/// Query strings, fragments and trailing path segments are ignored. The
/// result is not validated; resolution does that.
pub fn parse_share_link(link: &str) -> Option<&str> {
    let (_, rest) = link.trim().rsplit_once(WATCH_SEGMENT)?;
    let end = rest.find(['?', '#', '/']).unwrap_or(rest.len());
    let identifier = &rest[..end];
    (!identifier.is_empty()).then_some(identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_round_trips() {
        let id = Uuid::new_v4();
        for origin in ["https://watch.example.com", "https://watch.example.com/", "http://localhost:5173//"] {
            let link = share_link(origin, id);
            assert!(!link.contains("//watch"));
            let parsed = parse_share_link(&link).unwrap();
            assert_eq!(Uuid::parse_str(parsed).unwrap(), id);
        }
    }

    #[test]
    fn test_parse_ignores_query_and_fragment() {
        let id = "550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(
            parse_share_link(&format!("https://x.io/watch/{}?ref=tw#chat", id)),
            Some(id)
        );
        assert_eq!(parse_share_link(&format!("https://x.io/watch/{}/", id)), Some(id));
    }

    #[test]
    fn test_parse_rejects_non_links() {
        assert_eq!(parse_share_link("https://x.io/stream/abc"), None);
        assert_eq!(parse_share_link("https://x.io/watch/"), None);
        assert_eq!(parse_share_link("550e8400-e29b-41d4-a716-446655440000"), None);
    }

    #[test]
    fn test_malformed_identifier_passes_through() {
        assert_eq!(parse_share_link("https://x.io/watch/not-a-uuid"), Some("not-a-uuid"));
    }
}
