//! Realtime change stream over the Phoenix websocket protocol.

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::types::{ChangeEvent, ChangeSubscription};
use crate::models::Listing;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize, Deserialize)]
struct PhoenixMessage {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
    #[serde(rename = "ref")]
    reference: Option<String>,
}

/// Websocket endpoint for a project URL (`https` becomes `wss`)
pub fn socket_url(base_url: &Url, api_key: &str) -> BackendResult<Url> {
    let mut url = base_url
        .join("realtime/v1/websocket")
        .map_err(|e| BackendError::Validation(e.to_string()))?;

    let scheme = if url.scheme() == "http" { "ws" } else { "wss" };
    url.set_scheme(scheme)
        .map_err(|_| BackendError::Validation(format!("Cannot use {} for realtime", base_url)))?;

    url.query_pairs_mut()
        .append_pair("apikey", api_key)
        .append_pair("vsn", "1.0.0");
    Ok(url)
}

fn join_message(table: &str, access_token: &str) -> PhoenixMessage {
    PhoenixMessage {
        topic: format!("realtime:{}", table),
        event: "phx_join".to_string(),
        payload: json!({
            "config": {
                "postgres_changes": [
                    { "event": "*", "schema": "public", "table": table }
                ]
            },
            "access_token": access_token,
        }),
        reference: Some("1".to_string()),
    }
}

fn heartbeat_message(reference: u64) -> PhoenixMessage {
    PhoenixMessage {
        topic: "phoenix".to_string(),
        event: "heartbeat".to_string(),
        payload: json!({}),
        reference: Some(reference.to_string()),
    }
}

/// Decode a `postgres_changes` frame into a change event.
///
/// Returns `None` for frames that are not row changes (replies, presence,
/// heartbeats).
pub fn decode_change(text: &str) -> Option<ChangeEvent> {
    let message: PhoenixMessage = serde_json::from_str(text).ok()?;
    if message.event != "postgres_changes" {
        return None;
    }

    let data = message.payload.get("data")?;
    let record = || {
        data.get("record")
            .cloned()
            .and_then(|row| serde_json::from_value::<Listing>(row).ok())
    };

    let event = match data.get("type").and_then(Value::as_str)? {
        "INSERT" => record().map(ChangeEvent::Insert),
        "UPDATE" => record().map(ChangeEvent::Update),
        "DELETE" => data
            .get("old_record")
            .and_then(|old| old.get("id"))
            .and_then(Value::as_str)
            .map(|id| ChangeEvent::Delete { id: id.to_string() }),
        _ => None,
    };

    Some(event.unwrap_or(ChangeEvent::Other))
}

/// Open the socket, join the table channel and forward row changes
pub async fn subscribe(url: Url, table: &str, access_token: &str) -> BackendResult<ChangeSubscription> {
    let (socket, _) = connect_async(url.as_str()).await?;
    let (mut sink, mut stream) = socket.split();

    let join = serde_json::to_string(&join_message(table, access_token))
        .map_err(|e| BackendError::Validation(e.to_string()))?;
    sink.send(Message::Text(join)).await?;
    info!("Subscribed to realtime changes on {}", table);

    let (tx, rx) = mpsc::unbounded_channel();
    let table = table.to_string();

    let task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut reference: u64 = 1;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    reference += 1;
                    let Ok(beat) = serde_json::to_string(&heartbeat_message(reference)) else {
                        continue;
                    };
                    if let Err(e) = sink.send(Message::Text(beat)).await {
                        warn!("Realtime heartbeat failed: {}", e);
                        break;
                    }
                }
                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(event) = decode_change(&text) {
                                debug!("Change on {}: {:?}", table, event);
                                if tx.send(event).is_err() {
                                    break;
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!("Realtime stream for {} closed", table);
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Realtime stream error: {}", e);
                            break;
                        }
                    }
                }
            }
        }
    });

    Ok(ChangeSubscription::new(rx, task))
}
