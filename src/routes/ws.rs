//! WebSocket handler: bidirectional event relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a connection id and enters a `select!` loop:
//! - Incoming client text → decode at the boundary → `Session::handle`
//! - Events queued by room peers (and by our own session) → forward to client
//!
//! Decoding failures never reach the session. The sender gets one `error`
//! event and the connection stays open.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `connected` with `userId`
//! 2. Client sends events → decode → session mutates room and fans out
//! 3. Close or error → session leaves its room → empty rooms are swept

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::{self, ProtocolError, ServerEvent, Welcome};
use crate::services::session::Session;
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let user_id = Uuid::new_v4();

    // Per-connection queue for snapshots and broadcasts from room peers.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerEvent>(state.config.client_channel_capacity);
    let mut session = Session::new(user_id, client_tx);

    if send_event(&mut socket, &ServerEvent::Connected(Welcome { user_id }))
        .await
        .is_err()
    {
        return;
    }

    info!(%user_id, "ws: client connected");

    'conn: loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        for reply in process_inbound_text(&state, &mut session, &text).await {
                            if send_event(&mut socket, &reply).await.is_err() {
                                break 'conn;
                            }
                        }
                    }
                    Message::Binary(_) => {
                        let reply = ServerEvent::error_from(&ProtocolError::Binary);
                        if send_event(&mut socket, &reply).await.is_err() {
                            break 'conn;
                        }
                    }
                    Message::Close(_) => break 'conn,
                    _ => {}
                }
            }
            Some(event) = client_rx.recv() => {
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    // Strokes left open by this connection simply never complete for peers.
    session.leave(&state).await;
    info!(%user_id, "ws: client disconnected");
}

// =============================================================================
// INBOUND
// =============================================================================

/// Decode and handle one inbound text message. Returns events for the sender
/// that bypass the room queue (decode errors only).
async fn process_inbound_text(state: &AppState, session: &mut Session, text: &str) -> Vec<ServerEvent> {
    let event = match protocol::decode_client(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(user_id = %session.user_id(), error = %e, "ws: rejected inbound message");
            return vec![ServerEvent::error_from(&e)];
        }
    };

    session.handle(state, event).await;
    Vec::new()
}

// =============================================================================
// OUTBOUND
// =============================================================================

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), ()> {
    let json = match protocol::encode(event) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, event = event.name(), "ws: failed to serialize event");
            return Err(());
        }
    };
    if !event.is_chatty() {
        debug!(event = event.name(), "ws: send event");
    }
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
