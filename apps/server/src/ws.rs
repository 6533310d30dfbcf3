//! WebSocket relay.
//!
//! Clients join chats over one socket and receive every message posted to
//! those chats, whether it arrived over HTTP or from another socket.
//! Joining requires chat membership, checked at join time.

use axum::{
    Extension,
    extract::{
        State,
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use chat_store::ChatStore;
use entities::Message as ChatMessage;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use serde::{Deserialize, Serialize};
use tokio_stream::{
    StreamMap,
    wrappers::{BroadcastStream, errors::BroadcastStreamRecvError},
};
use uuid::Uuid;

use crate::middleware::AuthenticatedUser;
use crate::state::SharedState;

/// Events a client can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Start receiving messages for a chat.
    JoinChat { chat_id: Uuid },
    /// Stop receiving messages for a chat.
    LeaveChat { chat_id: Uuid },
}

/// Events the server sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Join confirmed.
    Joined { chat_id: Uuid },
    /// Leave confirmed.
    Left { chat_id: Uuid },
    /// A message posted to a joined chat.
    Message { message: ChatMessage },
    /// A client event could not be honored. The socket stays open.
    Error { message: String },
}

/// Handles `GET /ws`, upgrading to a WebSocket connection.
pub async fn handle_websocket<S: ChatStore + 'static>(
    State(state): State<SharedState<S>>,
    Extension(user): Extension<AuthenticatedUser>,
    ws: WebSocketUpgrade,
) -> Response {
    tracing::debug!(user_id = %user.id, "WebSocket connection opening");
    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

async fn handle_socket<S: ChatStore>(
    socket: WebSocket,
    state: SharedState<S>,
    user: AuthenticatedUser,
) {
    let (mut sink, mut stream) = socket.split();
    let mut joined: StreamMap<Uuid, BroadcastStream<ChatMessage>> = StreamMap::new();

    loop {
        tokio::select! {
            incoming = stream.next() => {
                let Some(Ok(frame)) = incoming else { break };
                match frame {
                    WsMessage::Text(text) => {
                        let reply = match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => handle_event(&state, &user, &mut joined, event).await,
                            Err(e) => ServerEvent::Error {
                                message: format!("Invalid event: {e}"),
                            },
                        };
                        if send_event(&mut sink, &reply).await.is_err() {
                            break;
                        }
                    }
                    WsMessage::Close(_) => break,
                    _ => {}
                }
            }
            // Guarded: an empty StreamMap yields None immediately and
            // would spin the loop.
            relayed = joined.next(), if !joined.is_empty() => {
                match relayed {
                    Some((_, Ok(message))) => {
                        let event = ServerEvent::Message { message };
                        if send_event(&mut sink, &event).await.is_err() {
                            break;
                        }
                    }
                    Some((chat_id, Err(BroadcastStreamRecvError::Lagged(missed)))) => {
                        tracing::warn!(%chat_id, missed, "WebSocket subscriber lagged");
                    }
                    None => {}
                }
            }
        }
    }

    tracing::debug!(user_id = %user.id, "WebSocket closed");
    state.rooms.cleanup_empty_channels();
}

async fn handle_event<S: ChatStore>(
    state: &SharedState<S>,
    user: &AuthenticatedUser,
    joined: &mut StreamMap<Uuid, BroadcastStream<ChatMessage>>,
    event: ClientEvent,
) -> ServerEvent {
    match event {
        ClientEvent::JoinChat { chat_id } => {
            match state.store.is_chat_member(chat_id, user.id).await {
                Ok(true) => {
                    let receiver = state.rooms.subscribe(chat_id);
                    joined.insert(chat_id, BroadcastStream::new(receiver));
                    tracing::debug!(user_id = %user.id, %chat_id, "WebSocket joined chat");
                    ServerEvent::Joined { chat_id }
                }
                Ok(false) => ServerEvent::Error {
                    message: "You are not a member of this chat".to_string(),
                },
                Err(e) => ServerEvent::Error {
                    message: e.to_string(),
                },
            }
        }
        ClientEvent::LeaveChat { chat_id } => {
            joined.remove(&chat_id);
            ServerEvent::Left { chat_id }
        }
    }
}

async fn send_event(
    sink: &mut SplitSink<WebSocket, WsMessage>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(event).unwrap_or_default();
    sink.send(WsMessage::Text(text)).await
}
