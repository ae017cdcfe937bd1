use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::schema::messages;

/// A chat message row as stored.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = messages)]
pub struct MessageRow {
    pub id: i64,
    pub hub_id: i64,
    pub sender_id: i64,
    /// Null for media-only messages created through the upload path.
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessage<'a> {
    pub id: i64,
    pub hub_id: i64,
    pub sender_id: i64,
    pub content: Option<&'a str>,
    pub media_url: Option<&'a str>,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A chat message as it travels on the broadcast bus and the wire: sender is
/// resolved to a username and `parent_id` is always present (null for roots).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub sender: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    pub parent_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

impl MessageRow {
    /// Wire form of this row, with the sender's username resolved by the caller.
    pub fn into_wire(self, sender: &str) -> ChatMessage {
        ChatMessage {
            id: self.id,
            sender: sender.to_string(),
            content: self.content.unwrap_or_default(),
            media_url: self.media_url,
            parent_id: self.parent_id,
            timestamp: self.created_at,
        }
    }
}
