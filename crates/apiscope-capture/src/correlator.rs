//! Traffic correlator — merges request/response notifications for one
//! browsing session into de-duplicated endpoint records.
//!
//! One correlator per scan session. Handlers are synchronous and
//! non-reentrant; any suspension (streamed body reads) belongs to the
//! session driver, which feeds events in arrival order.

use indexmap::map::Entry;
use indexmap::IndexMap;
use tracing::debug;

use crate::codec::decode_body;
use crate::filter::is_in_scope;
use crate::types::{
    header_value, CorrelationKey, EndpointRecord, Headers, NetworkEvent, RequestStarted,
    ResponseReceived,
};

/// Stateful request/response correlation table for a single session.
///
/// Records are keyed by `(method, url)`: two events with the same key
/// are the same logical exchange and get merged. Repeated calls to
/// the same endpoint before the first response resolves therefore
/// collapse into one record, last request winning; the earlier
/// instance's in-flight response is orphaned and dropped.
#[derive(Debug, Default)]
pub struct TrafficCorrelator {
    records: IndexMap<CorrelationKey, EndpointRecord>,
}

impl TrafficCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of exchanges tracked so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Dispatch a session notification to the matching handler.
    pub fn on_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::RequestStarted(req) => self.on_request_started(req),
            NetworkEvent::ResponseReceived(res) => self.on_response_received(res),
        }
    }

    /// Track a request leaving the page.
    ///
    /// Out-of-scope events are ignored. A second request on a live key
    /// replaces the request-side fields only; response fields already
    /// merged for that key are left intact.
    pub fn on_request_started(&mut self, event: RequestStarted) {
        if !is_in_scope(event.resource_type, &event.url) {
            return;
        }

        let content_type = header_value(&event.headers, "content-type").unwrap_or("");
        let body = decode_body(event.raw_body.as_deref(), content_type);
        let cookies_sent = header_value(&event.headers, "cookie").map(str::to_string);
        let key = CorrelationKey::new(&event.method, &event.url);

        match self.records.entry(key) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                record.request_headers = event.headers;
                record.body = body;
                record.cookies_sent = cookies_sent;
            }
            Entry::Vacant(entry) => {
                let method = event.method.to_uppercase();
                entry.insert(EndpointRecord {
                    method,
                    url: event.url,
                    request_headers: event.headers,
                    body,
                    cookies_sent,
                    status: None,
                    response_headers: Headers::new(),
                    cookies_received: None,
                    response_body: None,
                });
            }
        }
    }

    /// Merge a response into the tracked exchange for its key.
    ///
    /// A response with no tracked request is discarded: on a stable
    /// network stack the request event always precedes it, so an
    /// unmatched response belongs to traffic we chose not to track.
    pub fn on_response_received(&mut self, event: ResponseReceived) {
        if !is_in_scope(event.resource_type, &event.url) {
            return;
        }

        let key = CorrelationKey::new(&event.method, &event.url);
        let Some(record) = self.records.get_mut(&key) else {
            debug!(method = %key.method, url = %key.url, "dropping response with no tracked request");
            return;
        };

        record.status = Some(event.status);
        record.cookies_received = header_value(&event.headers, "set-cookie").map(str::to_string);
        record.response_body = decode_body(event.raw_body.as_deref(), &event.content_type);
        record.response_headers = event.headers;
    }

    /// Hand off all tracked records in first-insertion order.
    ///
    /// Records that never saw a response keep `status: None` and no
    /// response body; a page may issue requests that never resolve
    /// before the session ends, and that is not an error.
    pub fn finalize(self) -> Vec<EndpointRecord> {
        self.records.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceType;
    use serde_json::json;

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn request(method: &str, url: &str) -> RequestStarted {
        RequestStarted {
            method: method.to_string(),
            url: url.to_string(),
            headers: Headers::new(),
            raw_body: None,
            resource_type: ResourceType::Xhr,
        }
    }

    fn response(method: &str, url: &str, status: u16, body: &str) -> ResponseReceived {
        ResponseReceived {
            method: method.to_string(),
            url: url.to_string(),
            status,
            headers: headers(&[("content-type", "application/json")]),
            content_type: "application/json".to_string(),
            raw_body: Some(body.to_string()),
            resource_type: ResourceType::Xhr,
        }
    }

    #[test]
    fn test_request_response_pair_merges_once() {
        let mut correlator = TrafficCorrelator::new();
        let mut req = request("GET", "https://api.x/users/7");
        req.headers = headers(&[("accept", "application/json"), ("cookie", "sid=abc")]);
        correlator.on_request_started(req);
        correlator.on_response_received(response("GET", "https://api.x/users/7", 200, r#"{"id":7}"#));

        let records = correlator.finalize();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.method, "GET");
        assert_eq!(rec.status, Some(200));
        assert_eq!(rec.response_body, Some(json!({"id": 7})));
        // Request-side fields survive the merge.
        assert_eq!(rec.cookies_sent.as_deref(), Some("sid=abc"));
        assert_eq!(rec.request_headers.len(), 2);
    }

    #[test]
    fn test_unmatched_response_is_dropped() {
        let mut correlator = TrafficCorrelator::new();
        correlator.on_response_received(response("GET", "https://api.x/orphan", 200, "{}"));
        assert!(correlator.finalize().is_empty());
    }

    #[test]
    fn test_pending_record_without_response() {
        let mut correlator = TrafficCorrelator::new();
        correlator.on_request_started(request("GET", "https://api.x/slow"));

        let records = correlator.finalize();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, None);
        assert_eq!(records[0].response_body, None);
    }

    #[test]
    fn test_last_request_wins_but_keeps_merged_response() {
        let mut correlator = TrafficCorrelator::new();

        let mut first = request("POST", "https://api.x/items");
        first.headers = headers(&[("content-type", "application/json")]);
        first.raw_body = Some(r#"{"n":1}"#.to_string());
        correlator.on_request_started(first);
        correlator.on_response_received(response("POST", "https://api.x/items", 201, r#"{"ok":true}"#));

        let mut second = request("POST", "https://api.x/items");
        second.headers = headers(&[("content-type", "application/json")]);
        second.raw_body = Some(r#"{"n":2}"#.to_string());
        correlator.on_request_started(second);

        let records = correlator.finalize();
        assert_eq!(records.len(), 1);
        // Request side replaced by the newer instance.
        assert_eq!(records[0].body, Some(json!({"n": 2})));
        // Response side from the earlier instance is preserved.
        assert_eq!(records[0].status, Some(201));
        assert_eq!(records[0].response_body, Some(json!({"ok": true})));
    }

    #[test]
    fn test_out_of_scope_events_ignored() {
        let mut correlator = TrafficCorrelator::new();

        let mut asset = request("GET", "https://cdn.x/logo.png");
        asset.resource_type = ResourceType::Xhr;
        correlator.on_request_started(asset);

        let mut script = request("GET", "https://api.x/users");
        script.resource_type = ResourceType::Script;
        correlator.on_request_started(script);

        assert!(correlator.is_empty());
    }

    #[test]
    fn test_finalize_preserves_first_insertion_order() {
        let mut correlator = TrafficCorrelator::new();
        correlator.on_request_started(request("GET", "https://api.x/a"));
        correlator.on_request_started(request("GET", "https://api.x/b"));
        correlator.on_request_started(request("GET", "https://api.x/c"));
        // A repeat of /a must not move it to the back.
        correlator.on_request_started(request("GET", "https://api.x/a"));

        let urls: Vec<String> = correlator.finalize().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec!["https://api.x/a", "https://api.x/b", "https://api.x/c"]
        );
    }

    #[test]
    fn test_method_is_canonicalized_uppercase() {
        let mut correlator = TrafficCorrelator::new();
        correlator.on_request_started(request("post", "https://api.x/items"));
        correlator.on_response_received(response("POST", "https://api.x/items", 200, "{}"));

        let records = correlator.finalize();
        assert_eq!(records[0].method, "POST");
        assert_eq!(records[0].status, Some(200));
    }

    #[test]
    fn test_form_encoded_request_body() {
        let mut correlator = TrafficCorrelator::new();
        let mut req = request("POST", "https://api.x/login");
        req.headers = headers(&[("Content-Type", "application/x-www-form-urlencoded")]);
        req.raw_body = Some("user=ada&pass=secret".to_string());
        correlator.on_request_started(req);

        let records = correlator.finalize();
        assert_eq!(records[0].body, Some(json!({"user": "ada", "pass": "secret"})));
    }
}
