use axum::{
    debug_handler,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
};
use axum::extract::ws::WebSocket;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use super::presence::{Presence, PresenceEntry};

/// Fan-out unit for the realtime channel. `Broadcast` frames reach every
/// connection; `Direct` frames are forwarded only by the connection that owns
/// the target id.
#[derive(Clone, Debug)]
pub enum WsEvent {
    Broadcast(String),
    Direct { conn_id: Uuid, frame: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ClientFrame {
    #[serde(rename = "addUser", rename_all = "camelCase")]
    AddUser { user_id: Uuid },
    #[serde(rename = "sendMessage", rename_all = "camelCase")]
    SendMessage { sender_id: Uuid, receiver_id: Uuid, text: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ServerFrame {
    #[serde(rename = "getUsers")]
    Roster { users: Vec<PresenceEntry> },
    #[serde(rename = "getMessage", rename_all = "camelCase")]
    Message { sender_id: Uuid, text: String },
}

fn roster_frame(presence: &Presence) -> WsEvent {
    WsEvent::Broadcast(
        serde_json::to_string(&ServerFrame::Roster { users: presence.roster() }).unwrap_or_default(),
    )
}

#[debug_handler(state = crate::AppState)]
pub async fn chat_ws(
    State(presence): State<Presence>,
    State(tx): State<broadcast::Sender<WsEvent>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(async move |stream| handle_socket(stream, presence, tx).await)
}

async fn handle_socket(stream: WebSocket, presence: Presence, tx: broadcast::Sender<WsEvent>) {
    let conn_id = Uuid::now_v7();
    let mut rx = tx.subscribe();
    let (mut sender, mut receiver) = stream.split();

    let forward_task = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            let frame = match event {
                WsEvent::Broadcast(frame) => frame,
                WsEvent::Direct { conn_id: target, frame } if target == conn_id => frame,
                WsEvent::Direct { .. } => continue,
            };
            if sender.send(frame.into()).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        let Ok(frame) = serde_json::from_slice(&msg.into_data()) else {
            continue;
        };

        match frame {
            ClientFrame::AddUser { user_id } => {
                presence.register(user_id, conn_id);
                let _ = tx.send(roster_frame(&presence));
            }
            ClientFrame::SendMessage { sender_id, receiver_id, text } => {
                match presence.route(receiver_id) {
                    Some(target) => {
                        let _ = tx.send(WsEvent::Direct {
                            conn_id: target,
                            frame: serde_json::to_string(&ServerFrame::Message { sender_id, text })
                                .unwrap_or_default(),
                        });
                    }
                    // Offline target: realtime delivery is dropped, the
                    // durable copy lives in the message store.
                    None => debug!("receiver {receiver_id} offline"),
                }
            }
        }
    }

    presence.unregister(conn_id);
    let _ = tx.send(roster_frame(&presence));
    forward_task.abort();
}
