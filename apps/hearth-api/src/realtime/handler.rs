//! Admission and client-frame dispatch for hub sessions.

use crate::auth;
use crate::db::directory::Directory;
use crate::db::messages::MessageStore;
use crate::AppState;

use super::bus::BroadcastBus;
use super::events::{ClientFrame, HubEvent};
use super::session::Session;

/// Why a connection was refused before admission.
pub struct Rejection {
    /// WebSocket close code: 1008 (policy violation) for credential and
    /// membership refusals, 1011 for server-side failures.
    pub code: u16,
    pub reason: &'static str,
}

pub const CLOSE_POLICY_VIOLATION: u16 = 1008;
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// Run the connect handshake: resolve the identity, then the membership
/// gate. No side effects — nothing is registered until both pass.
pub async fn admit(
    state: &AppState,
    hub_id: i64,
    token: Option<&str>,
) -> Result<Session, Rejection> {
    let identity = match auth::resolve_identity(
        state.directory.as_ref(),
        &state.config.jwt_secret,
        token,
    )
    .await
    {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!(hub_id, code = %e.code, "connection rejected: unauthenticated");
            return Err(Rejection {
                code: CLOSE_POLICY_VIOLATION,
                reason: "unauthenticated",
            });
        }
    };

    match state.directory.is_admitted(identity.id, hub_id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(hub_id, user_id = identity.id, "connection rejected: not a member");
            return Err(Rejection {
                code: CLOSE_POLICY_VIOLATION,
                reason: "not a hub member",
            });
        }
        Err(e) => {
            tracing::error!(hub_id, user_id = identity.id, code = %e.code, "membership check failed");
            return Err(Rejection {
                code: CLOSE_INTERNAL_ERROR,
                reason: "membership check failed",
            });
        }
    }

    Ok(Session::new(hub_id, identity))
}

/// Handle one decoded client frame. Returns a frame to send privately back
/// to this connection, if any; group traffic goes through the bus.
pub async fn handle_frame(state: &AppState, session: &Session, text: &str) -> Option<HubEvent> {
    match ClientFrame::parse(text) {
        ClientFrame::Typing { is_typing } => {
            // Fire-and-forget; a failed publish only costs an indicator.
            if let Err(e) = state
                .bus
                .publish(
                    session.hub_id,
                    HubEvent::Typing {
                        user: session.identity.username.clone(),
                        is_typing,
                    },
                )
                .await
            {
                tracing::warn!(session_id = %session.session_id, code = %e.code, "typing publish failed");
            }
            None
        }
        ClientFrame::Chat { content, parent_id } => {
            if content.is_empty() {
                return None;
            }

            match state
                .messages
                .create(session.hub_id, &session.identity, &content, parent_id)
                .await
            {
                Ok(message) => {
                    if let Err(e) = state
                        .bus
                        .publish(session.hub_id, HubEvent::ChatMessage { message })
                        .await
                    {
                        tracing::warn!(session_id = %session.session_id, code = %e.code, "chat publish failed");
                    }
                    None
                }
                Err(e) => {
                    // Reported to the sender only; the group never sees a
                    // message that wasn't stored.
                    tracing::warn!(session_id = %session.session_id, code = %e.code, "chat persist failed");
                    Some(HubEvent::Error { message: e.message })
                }
            }
        }
        ClientFrame::Invalid { reason } => Some(HubEvent::Error {
            message: reason.to_string(),
        }),
        ClientFrame::Unknown => None,
    }
}
