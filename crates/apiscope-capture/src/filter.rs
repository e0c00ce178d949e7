//! Resource filter — decides which network events are API traffic.

use crate::types::ResourceType;

/// Extensions that mark a request as a static asset or tooling noise.
///
/// Pragmatic heuristic, not authoritative: a REST endpoint whose URL
/// happens to contain `.json` is excluded too. Matched against the
/// whole lowercased URL, not just the path.
const IGNORED_EXTENSIONS: &[&str] = &[
    ".svg", ".png", ".jpg", ".jpeg", ".gif", ".webp", ".css", ".js", ".ico", ".woff", ".woff2",
    ".ttf", ".otf", ".map", ".json",
];

/// Whether the URL matches the static-asset denylist.
pub fn should_ignore_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    IGNORED_EXTENSIONS.iter().any(|ext| lower.contains(ext))
}

/// Whether an event belongs in the endpoint capture: XHR/fetch traffic
/// that is not denylisted.
pub fn is_in_scope(resource_type: ResourceType, url: &str) -> bool {
    resource_type.is_api_traffic() && !should_ignore_url(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_xhr_and_fetch_are_in_scope() {
        let url = "https://api.example.com/users";
        assert!(is_in_scope(ResourceType::Xhr, url));
        assert!(is_in_scope(ResourceType::Fetch, url));
        assert!(!is_in_scope(ResourceType::Document, url));
        assert!(!is_in_scope(ResourceType::Script, url));
        assert!(!is_in_scope(ResourceType::Image, url));
    }

    #[test]
    fn test_denylisted_extensions() {
        assert!(should_ignore_url("https://cdn.example.com/logo.png"));
        assert!(should_ignore_url("https://cdn.example.com/LOGO.PNG"));
        assert!(should_ignore_url("https://example.com/app.css?v=2"));
        assert!(should_ignore_url("https://api.example.com/config.json"));
        assert!(!should_ignore_url("https://api.example.com/users/42"));
    }

    #[test]
    fn test_denylisted_xhr_is_filtered() {
        assert!(!is_in_scope(
            ResourceType::Xhr,
            "https://api.example.com/data.json"
        ));
    }
}
