//! Wire frames for the hub websocket, both directions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::Identity;
use crate::models::message::ChatMessage;

// ---------------------------------------------------------------------------
// Server → client frames
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceAction {
    Online,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineUser {
    pub username: String,
}

/// A frame sent to clients, tagged with its event type. The broadcast bus
/// carries the same union, so delivered events are written out verbatim.
///
/// `OnlineUsers` and `Error` are only ever sent privately to a single
/// connection; they never go through the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubEvent {
    ChatMessage {
        message: ChatMessage,
    },
    Typing {
        /// Sender's username.
        user: String,
        is_typing: bool,
    },
    Presence {
        action: PresenceAction,
        user: Identity,
    },
    OnlineUsers {
        users: Vec<OnlineUser>,
    },
    EventUpdate {
        event: Value,
    },
    EventNotification {
        event: Value,
    },
    Error {
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Client → server frames
// ---------------------------------------------------------------------------

/// A client frame normalized at the protocol boundary.
///
/// The legacy framing has no uniform discriminant: typing frames carry
/// `type: "typing"` while chat frames are recognized by the presence of a
/// `content` field. Everything is folded into an explicit variant here and
/// matched exhaustively; unknown or malformed input never reaches the
/// session logic as anything other than `Invalid` or `Unknown`.
#[derive(Debug, PartialEq)]
pub enum ClientFrame {
    Typing {
        is_typing: bool,
    },
    Chat {
        content: String,
        parent_id: Option<i64>,
    },
    /// Structurally recognizable but rejected; answered with a private error.
    Invalid {
        reason: &'static str,
    },
    /// Anything else, dropped without a reply.
    Unknown,
}

impl ClientFrame {
    pub fn parse(text: &str) -> Self {
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(_) => return ClientFrame::Unknown,
        };
        let Value::Object(map) = value else {
            return ClientFrame::Unknown;
        };

        match map.get("type").and_then(Value::as_str) {
            Some("typing") => match map.get("is_typing").and_then(Value::as_bool) {
                Some(is_typing) => ClientFrame::Typing { is_typing },
                // Malformed typing payloads are dropped, never fatal.
                None => ClientFrame::Unknown,
            },
            Some(_) => ClientFrame::Unknown,
            None => match map.get("content") {
                Some(Value::String(content)) => match parse_parent(map.get("parent")) {
                    Ok(parent_id) => ClientFrame::Chat {
                        content: content.clone(),
                        parent_id,
                    },
                    Err(reason) => ClientFrame::Invalid { reason },
                },
                Some(_) => ClientFrame::Invalid {
                    reason: "content must be a string",
                },
                None => ClientFrame::Unknown,
            },
        }
    }
}

/// The canonical "no parent" spellings are null and absent; everything else
/// (notably the legacy client's literal `"undefined"`) is rejected.
fn parse_parent(value: Option<&Value>) -> Result<Option<i64>, &'static str> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or("parent must be an integer message id"),
        Some(_) => Err("parent must be an integer message id or null"),
    }
}
