use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{SupportEvent, SupportTopic};
use crate::services::lifecycle::SupportSessionService;

pub type SupportEventReceiver = broadcast::Receiver<SupportEvent>;

const DEFAULT_CAPACITY: usize = 1000;

/// Fan-out of queue and session deltas to every current subscriber.
///
/// Delivery is best effort: with nobody subscribed the event is dropped, and a
/// subscriber that falls more than `capacity` events behind sees a lag error
/// and has to resync from the REST endpoints.
#[derive(Debug, Clone)]
pub struct SupportNotifier {
    sender: broadcast::Sender<SupportEvent>,
}

impl SupportNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns the number of subscribers that received the event.
    pub fn publish(&self, topic: SupportTopic, session_id: Option<Uuid>, payload: Value) -> usize {
        let event = SupportEvent {
            topic,
            session_id,
            payload,
            timestamp: Utc::now(),
        };

        match self.sender.send(event) {
            Ok(receivers) => {
                debug!("Published {:?} for {:?} to {} subscribers", topic, session_id, receivers);
                receivers
            }
            Err(_) => {
                debug!("No subscribers for {:?}", topic);
                0
            }
        }
    }

    pub fn subscribe(&self) -> SupportEventReceiver {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SupportNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// GET /ws
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(service): State<Arc<SupportSessionService>>,
) -> Response {
    let events = service.notifier().subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, events))
}

async fn handle_socket(socket: WebSocket, mut events: SupportEventReceiver) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let connection_id = Uuid::new_v4();
    debug!("WebSocket subscriber {} connected", connection_id);

    loop {
        tokio::select! {
            received = events.recv() => {
                let frame = match received {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to serialize {:?} event: {}", event.topic, e);
                            continue;
                        }
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("WebSocket subscriber {} lagged by {} events", connection_id, skipped);
                        resync_frame(skipped)
                    }
                    Err(RecvError::Closed) => break,
                };

                if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            incoming = ws_receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    // Clients only listen; ping/pong is handled by the transport.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    debug!("WebSocket subscriber {} disconnected", connection_id);
}

fn resync_frame(skipped: u64) -> String {
    json!({
        "topic": "resync",
        "skipped": skipped,
        "timestamp": Utc::now(),
    })
    .to_string()
}
