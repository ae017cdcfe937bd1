//! WebSocket upgrade handler and per-connection event loop.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::AppState;

use super::bus::{BroadcastBus, Subscription};
use super::events::{HubEvent, OnlineUser, PresenceAction};
use super::handler;
use super::presence::PresenceStore;
use super::session::Session;

pub fn router() -> Router<AppState> {
    Router::new().route("/ws/hub/{hub_id}", get(ws_upgrade))
}

#[derive(Debug, Deserialize)]
struct ConnectQuery {
    token: Option<String>,
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Path(hub_id): Path<i64>,
    Query(query): Query<ConnectQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, hub_id, query.token))
}

async fn handle_connection(socket: WebSocket, state: AppState, hub_id: i64, token: Option<String>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Connecting → Admitted, or Rejected with no side effects.
    let session = match handler::admit(&state, hub_id, token.as_deref()).await {
        Ok(session) => session,
        Err(rejection) => {
            let _ = send_close(&mut ws_tx, rejection.code, rejection.reason).await;
            return;
        }
    };

    tracing::info!(
        session_id = %session.session_id,
        hub_id,
        user_id = session.identity.id,
        "hub session admitted"
    );

    // Subscribe before registering or announcing anything, so this session
    // observes its own join event in the same order as everyone else.
    let mut sub = state.bus.subscribe(hub_id);

    if let Err(e) = state.presence.add(hub_id, &session.identity.username).await {
        tracing::error!(session_id = %session.session_id, code = %e.code, "presence registration failed");
        let _ = send_close(&mut ws_tx, handler::CLOSE_INTERNAL_ERROR, "presence unavailable").await;
        return;
    }

    run_session(&state, &session, &mut sub, &mut ws_tx, &mut ws_rx).await;

    // Teardown — reached from every exit out of the loop, exactly once.
    // Release the subscription first, then the presence entry, then announce.
    drop(sub);
    if let Err(e) = state
        .presence
        .remove(hub_id, &session.identity.username)
        .await
    {
        tracing::warn!(session_id = %session.session_id, code = %e.code, "presence removal failed");
    }
    if let Err(e) = state
        .bus
        .publish(
            hub_id,
            HubEvent::Presence {
                action: PresenceAction::Offline,
                user: session.identity.clone(),
            },
        )
        .await
    {
        tracing::warn!(session_id = %session.session_id, code = %e.code, "offline announce failed");
    }

    tracing::info!(session_id = %session.session_id, hub_id, "hub session ended");
}

/// Send the current roster privately, announce the join to the group, then
/// pump frames until the connection ends.
async fn run_session(
    state: &AppState,
    session: &Session,
    sub: &mut Subscription,
    ws_tx: &mut SplitSink<WebSocket, Message>,
    ws_rx: &mut SplitStream<WebSocket>,
) {
    // The roster goes only to this socket, and before the join announce, so
    // the new client never double-counts itself.
    let users = match state.presence.members(session.hub_id).await {
        Ok(names) => names
            .into_iter()
            .map(|username| OnlineUser { username })
            .collect(),
        Err(e) => {
            tracing::warn!(session_id = %session.session_id, code = %e.code, "presence roster unavailable");
            Vec::new()
        }
    };
    if send_event(ws_tx, &HubEvent::OnlineUsers { users }).await.is_err() {
        return;
    }

    if let Err(e) = state
        .bus
        .publish(
            session.hub_id,
            HubEvent::Presence {
                action: PresenceAction::Online,
                user: session.identity.clone(),
            },
        )
        .await
    {
        tracing::warn!(session_id = %session.session_id, code = %e.code, "online announce failed");
    }

    loop {
        tokio::select! {
            // Client sends us a frame.
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handler::handle_frame(state, session, &text).await {
                            if send_event(ws_tx, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue, // ping/pong/binary
                    Some(Err(e)) => {
                        tracing::debug!(session_id = %session.session_id, ?e, "ws read error");
                        break;
                    }
                }
            }

            // The bus delivers a group event (including our own).
            event = sub.recv() => {
                match event {
                    Some(msg) => {
                        if send_event(ws_tx, &msg.event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }
}

/// Serialize and write one event frame.
async fn send_event(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    event: &HubEvent,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(?e, "event serialization failed");
            return Ok(());
        }
    };
    ws_tx.send(Message::Text(json.into())).await
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    code: u16,
    reason: &str,
) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(axum::extract::ws::CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
