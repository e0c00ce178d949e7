//! Cookie-header parsing for the Markdown report.

/// One cookie from a raw `Cookie` or `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

/// Split a raw cookie header on `;` into name/value pairs.
///
/// The value is everything after the first `=`, so base64-ish values
/// with embedded `=` stay whole. A segment without `=` becomes a
/// cookie with an empty value.
pub fn parse_cookie_header(header: &str) -> Vec<Cookie> {
    header
        .split(';')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let (name, value) = part.split_once('=').unwrap_or((part, ""));
            Some(Cookie {
                name: name.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_pairs() {
        let cookies = parse_cookie_header("a=1; b=2");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name, "a");
        assert_eq!(cookies[0].value, "1");
        assert_eq!(cookies[1].name, "b");
        assert_eq!(cookies[1].value, "2");
    }

    #[test]
    fn test_value_with_embedded_equals() {
        let cookies = parse_cookie_header("token=abc==; path=/");
        assert_eq!(cookies[0].value, "abc==");
    }

    #[test]
    fn test_flag_without_value() {
        let cookies = parse_cookie_header("session=xyz; HttpOnly");
        assert_eq!(cookies[1].name, "HttpOnly");
        assert_eq!(cookies[1].value, "");
    }
}
