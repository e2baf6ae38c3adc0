use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::relay::{RelayConnection, RelayMessage, SubscribeMessage};
use crate::server::AppState;

/// Interval between server pings
pub const PING_INTERVAL: Duration = Duration::from_secs(30);

/// `GET /ws`
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (connection, outbound) = RelayConnection::new();
    debug!(connection = %connection.id(), "Relay connection opened");

    let writer = tokio::spawn(async move {
        if let Err(e) = write_outgoing(&mut sink, outbound).await {
            debug!(error = %e, "Relay writer stopped");
        }
    });

    read_incoming(&state, &connection, &mut stream).await;

    state.relay.unsubscribe(&connection).await;
    writer.abort();
    debug!(connection = %connection.id(), "Relay connection closed");
}

async fn write_outgoing(
    sink: &mut SplitSink<WebSocket, Message>,
    mut outbound: mpsc::UnboundedReceiver<RelayMessage>,
) -> Result<(), axum::Error> {
    let mut ping = tokio::time::interval(PING_INTERVAL);
    // The first tick completes immediately
    ping.tick().await;

    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else {
                    return Ok(());
                };
                match serde_json::to_string(&message) {
                    Ok(text) => sink.send(Message::Text(text.into())).await?,
                    Err(e) => warn!(error = %e, "Failed to serialize relay message"),
                }
            }
            _ = ping.tick() => {
                sink.send(Message::Ping(Bytes::new())).await?;
            }
        }
    }
}

async fn read_incoming(
    state: &AppState,
    connection: &RelayConnection,
    stream: &mut SplitStream<WebSocket>,
) {
    while let Some(result) = stream.next().await {
        let message = match result {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "Relay receive error");
                break;
            }
        };

        let Message::Text(text) = message else {
            if matches!(message, Message::Close(_)) {
                break;
            }
            continue;
        };

        match serde_json::from_str::<SubscribeMessage>(text.as_str()) {
            Ok(subscribe) if !subscribe.session_id.is_empty() => {
                subscribe_session(state, connection, &subscribe.session_id).await;
            }
            Ok(_) => debug!("Ignoring subscription without a session id"),
            Err(e) => debug!(error = %e, "Ignoring malformed relay message"),
        }
    }
}

/// Subscribe, then replay a terminal status that arrived before the subscription
async fn subscribe_session(state: &AppState, connection: &RelayConnection, session_id: &str) {
    state.relay.subscribe(connection, session_id).await;

    if let Some(session) = state.broker.session(session_id).await {
        if session.status.is_terminal() {
            let message = RelayMessage::new(session.status, session.transaction_details);
            let outcome = state.relay.dispatch(session_id, message).await;
            debug!(session_id = %session_id, ?outcome, "Replayed recorded status");
        }
    }
}
