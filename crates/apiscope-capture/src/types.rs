//! Capture types — network events and the endpoint records they merge into.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Header map in received order, case preserved.
pub type Headers = IndexMap<String, String>;

/// CDP resource type of a network request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Xhr,
    Fetch,
    Document,
    Stylesheet,
    Script,
    Image,
    Font,
    Media,
    WebSocket,
    Other,
}

impl ResourceType {
    /// Map a CDP `Network.ResourceType` string.
    pub fn from_cdp(raw: &str) -> Self {
        match raw {
            "XHR" => Self::Xhr,
            "Fetch" => Self::Fetch,
            "Document" => Self::Document,
            "Stylesheet" => Self::Stylesheet,
            "Script" => Self::Script,
            "Image" => Self::Image,
            "Font" => Self::Font,
            "Media" => Self::Media,
            "WebSocket" => Self::WebSocket,
            _ => Self::Other,
        }
    }

    /// Whether this resource type carries API traffic (XHR or fetch).
    pub fn is_api_traffic(&self) -> bool {
        matches!(self, Self::Xhr | Self::Fetch)
    }
}

/// A request leaving the page.
#[derive(Debug, Clone)]
pub struct RequestStarted {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub raw_body: Option<String>,
    pub resource_type: ResourceType,
}

/// A response arriving for a previously observed request.
#[derive(Debug, Clone)]
pub struct ResponseReceived {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Headers,
    pub content_type: String,
    pub raw_body: Option<String>,
    pub resource_type: ResourceType,
}

/// One notification from the browser session, consumed by the correlator.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    RequestStarted(RequestStarted),
    ResponseReceived(ResponseReceived),
}

/// Key identifying one logical exchange within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey {
    pub method: String,
    pub url: String,
}

impl CorrelationKey {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_uppercase(),
            url: url.to_string(),
        }
    }
}

/// Merged, finalized representation of one exchange.
///
/// Wire names match the JSON surface consumed by clients and stored in
/// the endpoint cache. Response-side fields stay absent until a
/// response is observed; a record that never completes is still valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub method: String,
    pub url: String,
    #[serde(rename = "requestHeaders", default)]
    pub request_headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(rename = "cookiesSent", default, skip_serializing_if = "Option::is_none")]
    pub cookies_sent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(rename = "responseHeaders", default, skip_serializing_if = "Headers::is_empty")]
    pub response_headers: Headers,
    #[serde(
        rename = "cookiesReceived",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cookies_received: Option<String>,
    #[serde(rename = "responseBody", default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<Value>,
}

/// Query-parameter descriptor in OpenAPI parameter-object shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    pub schema: ParamSchema,
    pub example: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSchema {
    #[serde(rename = "type")]
    pub value_type: String,
}

impl ParamDescriptor {
    /// An optional string-typed query parameter with an observed example.
    pub fn query(name: impl Into<String>, example: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: "query".to_string(),
            required: false,
            schema: ParamSchema {
                value_type: "string".to_string(),
            },
            example: example.into(),
        }
    }
}

/// Case-insensitive header lookup.
pub fn header_value<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
