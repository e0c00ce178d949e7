//! CDP transport — one DevTools WebSocket multiplexing id-correlated
//! commands and an ordered protocol event stream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use apiscope_core::{Error, Result};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<CommandOutcome>>>>;
type CommandOutcome = std::result::Result<Value, String>;

/// A protocol event pushed by the browser.
#[derive(Debug, Clone)]
pub struct CdpEvent {
    pub method: String,
    pub session_id: Option<String>,
    pub params: Value,
}

/// One decoded inbound frame.
enum Frame {
    Response { id: u64, outcome: CommandOutcome },
    Event(CdpEvent),
    Ignored,
}

fn parse_frame(text: &str) -> Frame {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        warn!("Unparseable CDP frame: {}", text);
        return Frame::Ignored;
    };

    if let Some(id) = value.get("id").and_then(Value::as_u64) {
        let outcome = if let Some(err) = value.get("error") {
            Err(err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown CDP error")
                .to_string())
        } else {
            Ok(value.get("result").cloned().unwrap_or(Value::Null))
        };
        return Frame::Response { id, outcome };
    }

    if let Some(method) = value.get("method").and_then(Value::as_str) {
        return Frame::Event(CdpEvent {
            method: method.to_string(),
            session_id: value
                .get("sessionId")
                .and_then(Value::as_str)
                .map(str::to_string),
            params: value.get("params").cloned().unwrap_or(Value::Null),
        });
    }

    Frame::Ignored
}

/// Command/event multiplexer over the browser's DevTools WebSocket.
pub struct CdpConnection {
    sink: tokio::sync::Mutex<WsSink>,
    pending: Pending,
    next_id: AtomicU64,
}

impl CdpConnection {
    /// Connect and spawn the reader task. Events arrive on the
    /// returned channel in protocol order.
    pub async fn connect(ws_url: &str) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<CdpEvent>)> {
        let (stream, _) = connect_async(ws_url)
            .await
            .map_err(|e| Error::Cdp(format!("connect failed: {}", e)))?;
        let (sink, mut read) = stream.split();

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let reader_pending = pending.clone();
        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let text = match message {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => continue,
                };
                match parse_frame(&text) {
                    Frame::Response { id, outcome } => {
                        if let Some(sender) = reader_pending.lock().remove(&id) {
                            let _ = sender.send(outcome);
                        }
                    }
                    Frame::Event(event) => {
                        if event_tx.send(event).is_err() {
                            break;
                        }
                    }
                    Frame::Ignored => {}
                }
            }
            debug!("CDP reader task finished");
        });

        Ok((
            Arc::new(Self {
                sink: tokio::sync::Mutex::new(sink),
                pending,
                next_id: AtomicU64::new(1),
            }),
            event_rx,
        ))
    }

    /// Send one command and wait for its response.
    pub async fn send(
        &self,
        method: &str,
        session_id: Option<&str>,
        params: Value,
    ) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut frame = json!({ "id": id, "method": method, "params": params });
        if let Some(session) = session_id {
            frame["sessionId"] = json!(session);
        }

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        {
            let mut sink = self.sink.lock().await;
            if let Err(e) = sink.send(Message::Text(frame.to_string())).await {
                self.pending.lock().remove(&id);
                return Err(Error::Cdp(format!("{} send failed: {}", method, e)));
            }
        }

        let outcome = match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => return Err(Error::Cdp(format!("{}: connection closed", method))),
            Err(_) => {
                self.pending.lock().remove(&id);
                return Err(Error::Cdp(format!("{} timed out", method)));
            }
        };

        outcome.map_err(|message| Error::Cdp(format!("{}: {}", method, message)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_frame() {
        let frame = parse_frame(r#"{"id":3,"result":{"targetId":"T1"}}"#);
        match frame {
            Frame::Response { id, outcome } => {
                assert_eq!(id, 3);
                assert_eq!(outcome.unwrap()["targetId"], "T1");
            }
            _ => panic!("expected response frame"),
        }
    }

    #[test]
    fn test_parse_error_frame() {
        let frame = parse_frame(r#"{"id":4,"error":{"code":-32000,"message":"No data found"}}"#);
        match frame {
            Frame::Response { id, outcome } => {
                assert_eq!(id, 4);
                assert_eq!(outcome.unwrap_err(), "No data found");
            }
            _ => panic!("expected response frame"),
        }
    }

    #[test]
    fn test_parse_event_frame() {
        let frame = parse_frame(
            r#"{"method":"Page.loadEventFired","sessionId":"S1","params":{"timestamp":1.0}}"#,
        );
        match frame {
            Frame::Event(event) => {
                assert_eq!(event.method, "Page.loadEventFired");
                assert_eq!(event.session_id.as_deref(), Some("S1"));
                assert_eq!(event.params["timestamp"], 1.0);
            }
            _ => panic!("expected event frame"),
        }
    }

    #[test]
    fn test_garbage_frame_ignored() {
        assert!(matches!(parse_frame("not json"), Frame::Ignored));
        assert!(matches!(parse_frame("{}"), Frame::Ignored));
    }
}
