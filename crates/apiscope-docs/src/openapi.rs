//! OpenAPI 3.0 synthesis from captured endpoint records.

use serde_json::{json, Map, Value};
use tracing::warn;

use apiscope_capture::urlnorm::{extract_query_params, normalize_path};
use apiscope_capture::EndpointRecord;

/// Build an OpenAPI 3.0 document from a finalized endpoint list.
///
/// `direct` selects addressing: `true` keys paths by the normalized
/// resource path; `false` rewrites every exchange onto the local
/// `/proxy` route with the original absolute URL as its `target`
/// query parameter, since an OpenAPI document cannot express
/// arbitrary remote hosts as distinct resource paths.
///
/// Returns `None` when there is nothing to synthesize, so an empty
/// capture is distinguishable from a degenerate empty document.
pub fn generate_openapi(endpoints: &[EndpointRecord], direct: bool) -> Option<Value> {
    if endpoints.is_empty() {
        return None;
    }

    let mut paths = Map::new();
    for endpoint in endpoints {
        if endpoint.method.is_empty() || endpoint.url.is_empty() {
            warn!(url = %endpoint.url, "skipping endpoint with missing method or url");
            continue;
        }

        let path_key = if direct {
            normalize_path(&endpoint.url)
        } else {
            format!("/proxy?target={}", endpoint.url)
        };

        let item = paths
            .entry(path_key)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(item) = item {
            item.insert(endpoint.method.to_lowercase(), operation_object(endpoint));
        }
    }

    Some(json!({
        "openapi": "3.0.0",
        "info": {
            "title": "API Documentation",
            "version": "1.0.0",
            "description": "Auto-generated API documentation"
        },
        "servers": [
            {
                "url": "http://localhost:3000",
                "description": "Proxy Server"
            }
        ],
        "paths": paths,
    }))
}

/// One operation object. Fields with no captured data are omitted
/// entirely rather than serialized as null.
fn operation_object(endpoint: &EndpointRecord) -> Value {
    let mut op = Map::new();
    op.insert(
        "description".to_string(),
        json!(format!(
            "Endpoint for {} {}",
            endpoint.method.to_uppercase(),
            endpoint.url
        )),
    );
    op.insert("parameters".to_string(), json!(extract_query_params(&endpoint.url)));

    if let Some(Value::Object(body)) = &endpoint.body {
        if !body.is_empty() {
            op.insert(
                "requestBody".to_string(),
                json!({
                    "required": true,
                    "content": {
                        "application/json": {
                            "schema": { "type": "object", "example": body }
                        }
                    }
                }),
            );
        }
    }

    let status = endpoint.status.unwrap_or(200).to_string();
    let mut response = Map::new();
    response.insert("description".to_string(), json!("Successful response"));

    if !endpoint.response_headers.is_empty() {
        let headers: Map<String, Value> = endpoint
            .response_headers
            .iter()
            .map(|(name, value)| {
                (
                    name.clone(),
                    json!({ "schema": { "type": "string" }, "example": value }),
                )
            })
            .collect();
        response.insert("headers".to_string(), Value::Object(headers));
    }

    let response_example = endpoint.response_body.clone().unwrap_or_else(|| json!({}));
    response.insert(
        "content".to_string(),
        json!({
            "application/json": {
                "schema": { "type": "object", "example": response_example }
            }
        }),
    );

    let mut responses = Map::new();
    responses.insert(status, Value::Object(response));
    op.insert("responses".to_string(), Value::Object(responses));
    Value::Object(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiscope_capture::Headers;
    use serde_json::json;

    fn record(method: &str, url: &str, status: Option<u16>, response_body: Option<Value>) -> EndpointRecord {
        EndpointRecord {
            method: method.to_string(),
            url: url.to_string(),
            request_headers: Headers::new(),
            body: None,
            cookies_sent: None,
            status,
            response_headers: Headers::new(),
            cookies_received: None,
            response_body,
        }
    }

    #[test]
    fn test_empty_list_yields_no_document() {
        assert!(generate_openapi(&[], true).is_none());
        assert!(generate_openapi(&[], false).is_none());
    }

    #[test]
    fn test_direct_paths_are_normalized() {
        let endpoints = vec![record(
            "GET",
            "https://api.x/users/7",
            Some(200),
            Some(json!({"id": 7})),
        )];
        let doc = generate_openapi(&endpoints, true).unwrap();

        assert_eq!(doc["openapi"], "3.0.0");
        let operation = &doc["paths"]["/users/{id}"]["get"];
        assert!(operation.is_object());
        let example = &operation["responses"]["200"]["content"]["application/json"]["schema"]["example"];
        assert_eq!(example, &json!({"id": 7}));
    }

    #[test]
    fn test_proxy_addressing_rewrites_paths() {
        let endpoints = vec![record("GET", "https://api.x/users/7", Some(200), None)];
        let doc = generate_openapi(&endpoints, false).unwrap();

        let operation = &doc["paths"]["/proxy?target=https://api.x/users/7"]["get"];
        assert!(operation.is_object());
    }

    #[test]
    fn test_missing_status_defaults_to_200() {
        let endpoints = vec![record("GET", "https://api.x/ping", None, None)];
        let doc = generate_openapi(&endpoints, true).unwrap();

        let responses = &doc["paths"]["/ping"]["get"]["responses"];
        assert!(responses["200"].is_object());
        // Empty capture renders an empty example object, never null.
        assert_eq!(
            responses["200"]["content"]["application/json"]["schema"]["example"],
            json!({})
        );
    }

    #[test]
    fn test_request_body_only_for_nonempty_objects() {
        let mut with_body = record("POST", "https://api.x/items", Some(201), None);
        with_body.body = Some(json!({"name": "widget"}));
        let mut string_body = record("POST", "https://api.x/raw", Some(200), None);
        string_body.body = Some(Value::String("plain text".to_string()));

        let doc = generate_openapi(&[with_body, string_body], true).unwrap();

        let post = &doc["paths"]["/items"]["post"];
        assert_eq!(post["requestBody"]["required"], true);
        assert_eq!(
            post["requestBody"]["content"]["application/json"]["schema"]["example"],
            json!({"name": "widget"})
        );
        // Non-object bodies do not produce a requestBody block.
        assert!(doc["paths"]["/raw"]["post"].get("requestBody").is_none());
    }

    #[test]
    fn test_response_headers_become_string_descriptors() {
        let mut rec = record("GET", "https://api.x/ping", Some(200), None);
        rec.response_headers = [("x-request-id".to_string(), "abc123".to_string())]
            .into_iter()
            .collect();
        let doc = generate_openapi(&[rec], true).unwrap();

        let header = &doc["paths"]["/ping"]["get"]["responses"]["200"]["headers"]["x-request-id"];
        assert_eq!(header["schema"]["type"], "string");
        assert_eq!(header["example"], "abc123");
    }

    #[test]
    fn test_query_params_carried_as_parameters() {
        let endpoints = vec![record("GET", "https://api.x/search?q=cats&page=2", Some(200), None)];
        let doc = generate_openapi(&endpoints, true).unwrap();

        let params = doc["paths"]["/search"]["get"]["parameters"]
            .as_array()
            .unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0]["name"], "q");
        assert_eq!(params[0]["in"], "query");
        assert_eq!(params[0]["example"], "cats");
    }

    #[test]
    fn test_methods_group_under_one_path() {
        let endpoints = vec![
            record("GET", "https://api.x/items/3", Some(200), None),
            record("DELETE", "https://api.x/items/8", Some(204), None),
        ];
        let doc = generate_openapi(&endpoints, true).unwrap();

        let item = &doc["paths"]["/items/{id}"];
        assert!(item["get"].is_object());
        assert!(item["delete"].is_object());
    }
}
