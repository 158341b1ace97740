//! Simulated remote debugging endpoint for integration tests.
//!
//! Binds a local WebSocket server, accepts one connection, and answers each
//! inbound request through a caller-supplied handler. Handlers can return
//! results, remote errors, nothing at all (to exercise timeouts), or a
//! result followed by a delayed notification (to exercise blocking waits).

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// What the endpoint does with one request.
pub enum Reply {
    /// Respond with `{id, result}`.
    Result(Value),
    /// Respond with `{id, error: {code, message}}`.
    Error(i64, String),
    /// Never respond.
    Ignore,
    /// Respond with a result, then send a notification after a delay.
    ResultThenEvent {
        result: Value,
        event_method: String,
        event_params: Value,
        delay: Duration,
    },
}

/// Per-request handler: `(method, params)` to a [`Reply`].
pub type Handler = Arc<dyn Fn(&str, &Value) -> Reply + Send + Sync>;

/// A running simulated endpoint.
pub struct FakeEndpoint {
    url: String,
}

impl FakeEndpoint {
    /// Binds to a random localhost port and serves one connection.
    pub async fn spawn(handler: Handler) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake endpoint");
        let port = listener.local_addr().expect("local addr").port();

        tokio::spawn(async move {
            let (stream, _) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(_) => return,
            };
            let ws_stream = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(_) => return,
            };

            let (mut ws_write, mut ws_read) = ws_stream.split();
            let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

            loop {
                tokio::select! {
                    frame = ws_read.next() => {
                        let text = match frame {
                            Some(Ok(Message::Text(text))) => text,
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => continue,
                            Some(Err(_)) => break,
                        };

                        let request: Value = match serde_json::from_str(&text) {
                            Ok(value) => value,
                            Err(_) => continue,
                        };
                        let id = request["id"].clone();
                        let method = request["method"].as_str().unwrap_or_default().to_string();
                        let params = request["params"].clone();

                        match handler(&method, &params) {
                            Reply::Result(result) => {
                                let response = json!({ "id": id, "result": result });
                                let _ = out_tx.send(response.to_string());
                            }
                            Reply::Error(code, message) => {
                                let response = json!({
                                    "id": id,
                                    "error": { "code": code, "message": message }
                                });
                                let _ = out_tx.send(response.to_string());
                            }
                            Reply::Ignore => {}
                            Reply::ResultThenEvent {
                                result,
                                event_method,
                                event_params,
                                delay,
                            } => {
                                let response = json!({ "id": id, "result": result });
                                let _ = out_tx.send(response.to_string());

                                let out_tx = out_tx.clone();
                                tokio::spawn(async move {
                                    tokio::time::sleep(delay).await;
                                    let event = json!({
                                        "method": event_method,
                                        "params": event_params,
                                    });
                                    let _ = out_tx.send(event.to_string());
                                });
                            }
                        }
                    }

                    outbound = out_rx.recv() => {
                        match outbound {
                            Some(text) => {
                                if ws_write.send(Message::Text(text.into())).await.is_err() {
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                }
            }
        });

        Self {
            url: format!("ws://127.0.0.1:{port}"),
        }
    }

    /// Returns the ws:// URL to connect to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Handler that answers every request with an empty result.
///
/// Sufficient for the domain-enable calls a session issues on connect.
pub fn acknowledge_everything() -> Handler {
    Arc::new(|_method, _params| Reply::Result(json!({})))
}
