//! Push channel: a client joins as an identity and receives that identity's events.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use courier_chats::{ConnectionId, PresenceChannel, PresenceEvent, PresenceSubscription};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::state::GatewayState;

/// Frames a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    /// Start receiving pushes for `identity`; replaces any earlier join on this socket.
    Join { identity: String },
    Leave,
    Ping,
}

/// Frames the server sends in reply to client frames. Pushes are serialized
/// [`PresenceEvent`]s, which share the same `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    Joined {
        identity: String,
        connection_id: ConnectionId,
    },
    Pong,
    Error {
        message: String,
    },
}

pub async fn presence_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
) -> Response {
    let presence = state.presence().clone();
    ws.on_upgrade(move |socket| handle_presence_socket(socket, presence))
}

/// What woke the connection loop up.
enum Step {
    Client(Option<Result<Message, axum::Error>>),
    Push(PresenceEvent),
}

async fn handle_presence_socket(socket: WebSocket, presence: PresenceChannel) {
    let (mut sender, mut receiver) = socket.split();
    let mut session: Option<PresenceSubscription> = None;

    loop {
        let step = tokio::select! {
            incoming = receiver.next() => Step::Client(incoming),
            Some(event) = next_push(&mut session) => Step::Push(event),
        };

        let outgoing = match step {
            Step::Client(Some(Ok(Message::Text(text)))) => {
                let reply = handle_client_text(&text, &presence, &mut session).await;
                reply.and_then(|frame| encode(&frame))
            }
            Step::Client(Some(Ok(Message::Close(_)))) | Step::Client(None) => break,
            Step::Client(Some(Err(error))) => {
                debug!(%error, "websocket receive failed");
                break;
            }
            Step::Client(Some(Ok(_))) => None,
            Step::Push(event) => encode(&event),
        };

        if let Some(text) = outgoing {
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    }

    if let Some(subscription) = session.take() {
        presence
            .unsubscribe(&subscription.identity, subscription.connection_id)
            .await;
        info!(identity = %subscription.identity, "presence connection closed");
    }
}

/// Parks forever while nobody has joined, so the select only wakes for client frames.
async fn next_push(session: &mut Option<PresenceSubscription>) -> Option<PresenceEvent> {
    match session {
        Some(subscription) => subscription.receiver.recv().await,
        None => std::future::pending().await,
    }
}

/// Apply one client frame to the connection's session and produce the reply, if any.
pub async fn handle_client_text(
    text: &str,
    presence: &PresenceChannel,
    session: &mut Option<PresenceSubscription>,
) -> Option<ServerFrame> {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(error) => {
            return Some(ServerFrame::Error {
                message: format!("unrecognised frame: {error}"),
            })
        }
    };

    match frame {
        ClientFrame::Join { identity } => {
            leave(presence, session).await;
            match presence.subscribe(&identity).await {
                Ok(subscription) => {
                    let reply = ServerFrame::Joined {
                        identity: subscription.identity.clone(),
                        connection_id: subscription.connection_id,
                    };
                    info!(identity = %subscription.identity, "presence connection joined");
                    *session = Some(subscription);
                    Some(reply)
                }
                Err(error) => Some(ServerFrame::Error {
                    message: error.to_string(),
                }),
            }
        }
        ClientFrame::Leave => {
            leave(presence, session).await;
            None
        }
        ClientFrame::Ping => Some(ServerFrame::Pong),
    }
}

async fn leave(presence: &PresenceChannel, session: &mut Option<PresenceSubscription>) {
    if let Some(subscription) = session.take() {
        presence
            .unsubscribe(&subscription.identity, subscription.connection_id)
            .await;
    }
}

fn encode<T: Serialize>(frame: &T) -> Option<String> {
    match serde_json::to_string(frame) {
        Ok(text) => Some(text),
        Err(error) => {
            warn!(%error, "failed to encode websocket frame");
            None
        }
    }
}
