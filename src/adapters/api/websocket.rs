//! WebSocket push of strategy updates

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::AppState;
use crate::domain::snapshot::StrategySnapshot;
use crate::ports::observer::StrategyObserver;

/// Snapshots buffered per subscriber before it starts lagging
pub const BROADCAST_CAPACITY: usize = 64;

/// Events pushed to clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    Connected { message: String },
    StrategyUpdate(StrategySnapshot),
    Pong { timestamp: chrono::DateTime<Utc> },
}

impl StreamEvent {
    fn to_message(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(text) => Some(Message::Text(text.into())),
            Err(e) => {
                warn!(error = %e, "Failed to serialize stream event");
                None
            }
        }
    }
}

/// Observer fanning snapshots out to every connected socket.
/// Sending never blocks; with no subscribers the snapshot is dropped.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    tx: broadcast::Sender<StrategySnapshot>,
}

impl BroadcastObserver {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StrategySnapshot> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastObserver {
    fn default() -> Self {
        Self::new(BROADCAST_CAPACITY)
    }
}

impl StrategyObserver for BroadcastObserver {
    fn on_strategy_update(&self, snapshot: &StrategySnapshot) {
        if self.tx.send(snapshot.clone()).is_err() {
            debug!("No WebSocket subscribers for strategy update");
        }
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let updates = state.updates.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, updates))
}

async fn handle_socket(socket: WebSocket, mut updates: broadcast::Receiver<StrategySnapshot>) {
    info!("Client connected");
    let (mut sender, mut receiver) = socket.split();

    let hello = StreamEvent::Connected {
        message: "Connected to server".to_string(),
    };
    if let Some(msg) = hello.to_message() {
        if sender.send(msg).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            update = updates.recv() => {
                let snapshot = match update {
                    Ok(snapshot) => snapshot,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "WebSocket client lagging, updates dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if let Some(msg) = StreamEvent::StrategyUpdate(snapshot).to_message() {
                    if sender.send(msg).await.is_err() {
                        break;
                    }
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) if text.as_str().trim() == "ping" => {
                        let pong = StreamEvent::Pong { timestamp: Utc::now() };
                        if let Some(msg) = pong.to_message() {
                            if sender.send(msg).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }

    info!("Client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{Position, TradeAction};
    use crate::domain::signal::Signal;

    fn snapshot() -> StrategySnapshot {
        StrategySnapshot {
            timestamp: Utc::now(),
            price_a: 82.0,
            price_b: 78.0,
            spread: 0.4,
            spread_mean: 0.0,
            spread_std: 0.2,
            z_score: 2.0,
            signal: Signal::Hold,
            position: Position::Flat,
            action: TradeAction::Hold,
            action_details: TradeAction::Hold.details("BZ=F", "CL=F"),
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let observer = BroadcastObserver::new(8);
        let mut rx = observer.subscribe();
        assert_eq!(observer.subscriber_count(), 1);

        let snap = snapshot();
        observer.on_strategy_update(&snap);
        assert_eq!(rx.recv().await.unwrap(), snap);
    }

    #[test]
    fn test_broadcast_without_subscribers_is_noop() {
        let observer = BroadcastObserver::default();
        observer.on_strategy_update(&snapshot());
        assert_eq!(observer.subscriber_count(), 0);
    }

    #[test]
    fn test_event_encoding() {
        let json = serde_json::to_value(StreamEvent::StrategyUpdate(snapshot())).unwrap();
        assert_eq!(json["type"], "strategy_update");
        assert_eq!(json["data"]["signal"], "HOLD");
        assert_eq!(json["data"]["action"], "HOLD");

        let json = serde_json::to_value(StreamEvent::Connected {
            message: "Connected to server".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "connected");
        assert_eq!(json["data"]["message"], "Connected to server");
    }
}
