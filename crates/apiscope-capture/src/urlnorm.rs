//! URL utilities — path normalization and query-parameter extraction.

use url::Url;

use crate::types::ParamDescriptor;

/// Reduce a URL to its path with numeric segments generalized to `{id}`.
///
/// `https://api.x/users/482/orders/17` becomes `/users/{id}/orders/{id}`.
/// Bare paths are accepted as well; anything unparseable is returned
/// unchanged.
pub fn normalize_path(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(parsed) => generalize_segments(parsed.path()),
        // Not an absolute URL; a bare path can still be normalized.
        Err(_) if raw.starts_with('/') => {
            let path = raw.split(['?', '#']).next().unwrap_or(raw);
            generalize_segments(path)
        }
        Err(_) => raw.to_string(),
    }
}

fn generalize_segments(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Extract query parameters as OpenAPI descriptors.
///
/// One descriptor per distinct name in encounter order; duplicates keep
/// the first observed value as the example. Malformed URLs yield no
/// parameters.
pub fn extract_query_params(raw: &str) -> Vec<ParamDescriptor> {
    let Ok(parsed) = Url::parse(raw) else {
        return Vec::new();
    };

    let mut params: Vec<ParamDescriptor> = Vec::new();
    for (name, value) in parsed.query_pairs() {
        if params.iter().any(|p| p.name == name) {
            continue;
        }
        params.push(ParamDescriptor::query(name, value));
    }
    params
}
