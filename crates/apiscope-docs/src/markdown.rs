//! Markdown report synthesis — one human-readable section per
//! captured exchange, with a runnable curl reconstruction.

use std::fmt::Write;

use serde_json::Value;
use url::Url;

use crate::cookie::parse_cookie_header;
use apiscope_capture::EndpointRecord;

/// Render the endpoint list as a Markdown report.
///
/// Returns `None` for an empty list so callers can distinguish "no
/// data" from a successful report. Sections missing optional data
/// simply omit that subsection; no placeholder text is emitted.
pub fn generate_markdown(endpoints: &[EndpointRecord]) -> Option<String> {
    if endpoints.is_empty() {
        return None;
    }

    let mut md = String::from("# API Documentation\n\n");
    for (index, endpoint) in endpoints.iter().enumerate() {
        if endpoint.method.is_empty() || endpoint.url.is_empty() {
            continue;
        }
        render_endpoint(&mut md, index + 1, endpoint);
    }

    Some(md)
}

fn render_endpoint(md: &mut String, number: usize, endpoint: &EndpointRecord) {
    let method = endpoint.method.to_uppercase();

    if let Ok(parsed) = Url::parse(&endpoint.url) {
        let _ = writeln!(md, "**Origin**: `{}`\n", parsed.origin().ascii_serialization());
    }
    let _ = writeln!(md, "## {}. `{} {}`\n", number, method, endpoint.url);
    let _ = writeln!(md, "**Status**: {}\n", endpoint.status.unwrap_or(200));

    // Runnable reconstruction of the request.
    md.push_str("### Example Curl:\n```bash\n");
    let _ = write!(md, "curl -X {} \"{}\"", method, endpoint.url);
    for (name, value) in &endpoint.request_headers {
        let _ = write!(md, " \\\n  -H \"{}: {}\"", name, value);
    }
    if let Some(body) = body_with_content(&endpoint.body) {
        let _ = write!(md, " \\\n  -d '{}'", body);
    }
    md.push_str("\n```\n\n");

    if !endpoint.request_headers.is_empty() {
        md.push_str("### Request Headers:\n");
        for (name, value) in &endpoint.request_headers {
            let _ = writeln!(md, "- {}: {}", name, value);
        }
        md.push('\n');
    }

    render_cookies(md, "Cookies Sent", endpoint.cookies_sent.as_deref());

    if let Some(body) = &endpoint.body {
        if has_content(body) {
            md.push_str("### Request Body:\n");
            render_json_block(md, body);
        }
    }

    if !endpoint.response_headers.is_empty() {
        md.push_str("### Response Headers:\n");
        for (name, value) in &endpoint.response_headers {
            let _ = writeln!(md, "- {}: {}", name, value);
        }
        md.push('\n');
    }

    render_cookies(md, "Cookies Received", endpoint.cookies_received.as_deref());

    if let Some(body) = &endpoint.response_body {
        if has_content(body) {
            md.push_str("### Response Body:\n");
            render_json_block(md, body);
        }
    }

    md.push_str("---\n\n");
}

fn render_cookies(md: &mut String, title: &str, header: Option<&str>) {
    let Some(header) = header else { return };
    let cookies = parse_cookie_header(header);
    if cookies.is_empty() {
        return;
    }
    let _ = writeln!(md, "### {}:", title);
    for cookie in cookies {
        let _ = writeln!(md, "- {}: {}", cookie.name, cookie.value);
    }
    md.push('\n');
}

fn render_json_block(md: &mut String, value: &Value) {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    let _ = writeln!(md, "```json\n{}\n```\n", pretty);
}

/// Compact serialization for the curl `-d` argument, skipping bodies
/// with nothing in them.
fn body_with_content(body: &Option<Value>) -> Option<String> {
    let body = body.as_ref()?;
    if !has_content(body) {
        return None;
    }
    serde_json::to_string(body).ok()
}

fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}
