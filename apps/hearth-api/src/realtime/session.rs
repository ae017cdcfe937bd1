//! Per-connection session state.

use hearth_common::id::{prefix, prefixed_ulid};

use crate::auth::Identity;

/// State for a single admitted hub connection.
///
/// Created only after the membership gate passes; holds nothing that needs
/// releasing itself — the bus subscription and the presence entry are owned
/// by the connection task, which tears both down on every exit path.
pub struct Session {
    /// Unique session identifier (`ses_` prefixed ULID), for log correlation.
    pub session_id: String,
    /// The hub this connection is bound to.
    pub hub_id: i64,
    /// Authenticated user, resolved once at connect and immutable after.
    pub identity: Identity,
}

impl Session {
    pub fn new(hub_id: i64, identity: Identity) -> Self {
        Self {
            session_id: prefixed_ulid(prefix::SESSION),
            hub_id,
            identity,
        }
    }
}
