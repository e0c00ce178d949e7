//! Scan session — drives one navigation and feeds the captured
//! network traffic into a correlator.
//!
//! Requests are fed to the correlator as they happen. Response bodies
//! are only available from CDP on demand, so response metadata is held
//! until the page has settled, then each body is pulled with
//! `Network.getResponseBody` and the completed response event is
//! merged. Per-key req→res causality is preserved because a response
//! is never merged before its request was recorded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use apiscope_capture::{
    header_value, EndpointRecord, Headers, RequestStarted, ResourceType, ResponseReceived,
    TrafficCorrelator,
};
use apiscope_core::{Error, Result};

use crate::cdp::{CdpConnection, CdpEvent};

/// Response metadata held until the session settles and its body can
/// be pulled over CDP.
#[derive(Debug)]
struct PendingResponse {
    request_id: String,
    method: String,
    url: String,
    status: u16,
    headers: Headers,
    content_type: String,
    resource_type: ResourceType,
}

/// One attached page target inside a running browser.
pub struct ScanSession {
    conn: Arc<CdpConnection>,
    events: mpsc::UnboundedReceiver<CdpEvent>,
    session_id: String,
}

impl ScanSession {
    /// Create a page target and attach to it with network and page
    /// domains enabled.
    pub async fn attach(
        conn: Arc<CdpConnection>,
        events: mpsc::UnboundedReceiver<CdpEvent>,
    ) -> Result<Self> {
        let target = conn
            .send("Target.createTarget", None, json!({ "url": "about:blank" }))
            .await?;
        let target_id = target
            .get("targetId")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Cdp("Target.createTarget returned no targetId".to_string()))?
            .to_string();

        let attached = conn
            .send(
                "Target.attachToTarget",
                None,
                json!({ "targetId": target_id, "flatten": true }),
            )
            .await?;
        let session_id = attached
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Cdp("Target.attachToTarget returned no sessionId".to_string()))?
            .to_string();

        conn.send("Network.enable", Some(&session_id), json!({})).await?;
        conn.send("Page.enable", Some(&session_id), json!({})).await?;

        Ok(Self {
            conn,
            events,
            session_id,
        })
    }

    /// Drive one navigation and return the finalized endpoint list.
    ///
    /// The page-load wait is bounded by `navigation_timeout_ms`;
    /// exceeding it is fatal for the scan. After the load event, a
    /// fixed settle delay of `delay_ms` keeps capturing late traffic.
    pub async fn run(
        mut self,
        url: &str,
        delay_ms: u64,
        navigation_timeout_ms: u64,
    ) -> Result<Vec<EndpointRecord>> {
        let mut correlator = TrafficCorrelator::new();
        // Request id -> method; CDP response events do not carry the
        // request method.
        let mut methods: HashMap<String, String> = HashMap::new();
        let mut pending: Vec<PendingResponse> = Vec::new();

        self.conn
            .send("Page.navigate", Some(&self.session_id), json!({ "url": url }))
            .await?;

        // Wait for the load event, capturing as we go.
        let deadline = Instant::now() + Duration::from_millis(navigation_timeout_ms);
        loop {
            let event = tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return Err(Error::NavigationTimeout),
                event = self.events.recv() => event
                    .ok_or_else(|| Error::Cdp("browser connection closed mid-session".to_string()))?,
            };
            if event.session_id.as_deref() != Some(self.session_id.as_str()) {
                continue;
            }
            let loaded = event.method == "Page.loadEventFired";
            record_network_event(&event, &mut correlator, &mut methods, &mut pending);
            if loaded {
                break;
            }
        }
        info!("Page loaded: {} ({} exchanges tracked)", url, correlator.len());

        // Fixed post-load settle delay, still capturing.
        let settle_deadline = Instant::now() + Duration::from_millis(delay_ms);
        loop {
            let event = tokio::select! {
                _ = tokio::time::sleep_until(settle_deadline) => break,
                event = self.events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            if event.session_id.as_deref() != Some(self.session_id.as_str()) {
                continue;
            }
            record_network_event(&event, &mut correlator, &mut methods, &mut pending);
        }

        // Pull response bodies and complete the exchanges, in arrival
        // order. A missing body degrades to a bodiless response.
        for response in pending {
            let raw_body = self.fetch_body(&response.request_id).await;
            correlator.on_response_received(ResponseReceived {
                method: response.method,
                url: response.url,
                status: response.status,
                headers: response.headers,
                content_type: response.content_type,
                raw_body,
                resource_type: response.resource_type,
            });
        }

        Ok(correlator.finalize())
    }

    async fn fetch_body(&self, request_id: &str) -> Option<String> {
        match self
            .conn
            .send(
                "Network.getResponseBody",
                Some(&self.session_id),
                json!({ "requestId": request_id }),
            )
            .await
        {
            Ok(result) => {
                let body = result.get("body").and_then(Value::as_str)?.to_string();
                if result
                    .get("base64Encoded")
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
                {
                    let bytes = BASE64.decode(body.as_bytes()).ok()?;
                    Some(String::from_utf8_lossy(&bytes).into_owned())
                } else {
                    Some(body)
                }
            }
            Err(e) => {
                debug!("No response body for {}: {}", request_id, e);
                None
            }
        }
    }
}

fn record_network_event(
    event: &CdpEvent,
    correlator: &mut TrafficCorrelator,
    methods: &mut HashMap<String, String>,
    pending: &mut Vec<PendingResponse>,
) {
    match event.method.as_str() {
        "Network.requestWillBeSent" => {
            if let Some((request_id, started)) = request_started_from_params(&event.params) {
                methods.insert(request_id, started.method.clone());
                correlator.on_request_started(started);
            }
        }
        "Network.responseReceived" => {
            if let Some(response) = pending_response_from_params(&event.params, methods) {
                // Only hold responses worth a body fetch.
                if apiscope_capture::filter::is_in_scope(response.resource_type, &response.url) {
                    pending.push(response);
                }
            }
        }
        _ => {}
    }
}

/// Decode `Network.requestWillBeSent` params.
fn request_started_from_params(params: &Value) -> Option<(String, RequestStarted)> {
    let request_id = params.get("requestId")?.as_str()?.to_string();
    let request = params.get("request")?;
    let resource_type =
        ResourceType::from_cdp(params.get("type").and_then(Value::as_str).unwrap_or(""));

    let started = RequestStarted {
        method: request.get("method")?.as_str()?.to_string(),
        url: request.get("url")?.as_str()?.to_string(),
        headers: headers_from_value(request.get("headers")),
        raw_body: request
            .get("postData")
            .and_then(Value::as_str)
            .map(str::to_string),
        resource_type,
    };
    Some((request_id, started))
}

/// Decode `Network.responseReceived` params, pairing the method
/// recorded for the same request id.
fn pending_response_from_params(
    params: &Value,
    methods: &HashMap<String, String>,
) -> Option<PendingResponse> {
    let request_id = params.get("requestId")?.as_str()?.to_string();
    let response = params.get("response")?;
    let url = response.get("url")?.as_str()?.to_string();
    let method = methods.get(&request_id)?.clone();
    let headers = headers_from_value(response.get("headers"));
    let content_type = header_value(&headers, "content-type")
        .map(str::to_string)
        .or_else(|| {
            response
                .get("mimeType")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_default();

    Some(PendingResponse {
        request_id,
        method,
        url,
        status: response.get("status").and_then(Value::as_u64).unwrap_or(0) as u16,
        headers,
        content_type,
        resource_type: ResourceType::from_cdp(
            params.get("type").and_then(Value::as_str).unwrap_or(""),
        ),
    })
}

fn headers_from_value(value: Option<&Value>) -> Headers {
    let mut headers = Headers::new();
    if let Some(Value::Object(map)) = value {
        for (name, value) in map {
            if let Some(value) = value.as_str() {
                headers.insert(name.clone(), value.to_string());
            }
        }
    }
    headers
}
