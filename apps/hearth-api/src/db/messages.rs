//! Append-only chat message persistence.
//!
//! Messages are independent rows keyed by a snowflake id assigned here, so
//! concurrent writers never conflict. Threading invariant: a parent message
//! must belong to the same hub as its reply.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::result::OptionalExtension;
use parking_lot::Mutex;

use hearth_common::SnowflakeGenerator;

use crate::auth::Identity;
use crate::db::pool::DbPool;
use crate::db::schema::messages;
use crate::error::ApiError;
use crate::models::message::{ChatMessage, MessageRow, NewMessage};

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a chat message and return its wire form.
    ///
    /// Fails if `parent_id` does not resolve to a message in `hub_id`, or on
    /// storage errors. Never mutates existing rows.
    async fn create(
        &self,
        hub_id: i64,
        sender: &Identity,
        content: &str,
        parent_id: Option<i64>,
    ) -> Result<ChatMessage, ApiError>;
}

// ---------------------------------------------------------------------------
// Postgres implementation
// ---------------------------------------------------------------------------

pub struct DieselMessageStore {
    db: DbPool,
    snowflake: Arc<SnowflakeGenerator>,
}

impl DieselMessageStore {
    pub fn new(db: DbPool, snowflake: Arc<SnowflakeGenerator>) -> Self {
        Self { db, snowflake }
    }
}

#[async_trait]
impl MessageStore for DieselMessageStore {
    async fn create(
        &self,
        hub_id: i64,
        sender: &Identity,
        content: &str,
        parent_id: Option<i64>,
    ) -> Result<ChatMessage, ApiError> {
        let mut conn = self.db.get().await?;

        if let Some(parent) = parent_id {
            let parent_hub: Option<i64> = diesel_async::RunQueryDsl::get_result(
                messages::table.find(parent).select(messages::hub_id),
                &mut conn,
            )
            .await
            .optional()?;

            match parent_hub {
                None => return Err(ApiError::not_found("Parent message not found")),
                Some(h) if h != hub_id => {
                    return Err(ApiError::bad_request(
                        "Parent message belongs to a different hub",
                    ))
                }
                Some(_) => {}
            }
        }

        let row: MessageRow = diesel_async::RunQueryDsl::get_result(
            diesel::insert_into(messages::table)
                .values(NewMessage {
                    id: self.snowflake.generate(),
                    hub_id,
                    sender_id: sender.id,
                    content: Some(content),
                    media_url: None,
                    parent_id,
                    created_at: Utc::now(),
                })
                .returning(MessageRow::as_returning()),
            &mut conn,
        )
        .await?;

        Ok(row.into_wire(&sender.username))
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation (tests / single-process fallback)
// ---------------------------------------------------------------------------

struct StoredMessage {
    hub_id: i64,
    message: ChatMessage,
}

pub struct MemoryMessageStore {
    rows: Mutex<Vec<StoredMessage>>,
    snowflake: Arc<SnowflakeGenerator>,
    failing: AtomicBool,
}

impl MemoryMessageStore {
    pub fn new(snowflake: Arc<SnowflakeGenerator>) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            snowflake,
            failing: AtomicBool::new(false),
        }
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every subsequent `create` fail, to exercise persistence-failure
    /// handling in tests.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn create(
        &self,
        hub_id: i64,
        sender: &Identity,
        content: &str,
        parent_id: Option<i64>,
    ) -> Result<ChatMessage, ApiError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ApiError::internal("Message store unavailable"));
        }

        let mut rows = self.rows.lock();

        if let Some(parent) = parent_id {
            match rows.iter().find(|r| r.message.id == parent) {
                None => return Err(ApiError::not_found("Parent message not found")),
                Some(r) if r.hub_id != hub_id => {
                    return Err(ApiError::bad_request(
                        "Parent message belongs to a different hub",
                    ))
                }
                Some(_) => {}
            }
        }

        let message = ChatMessage {
            id: self.snowflake.generate(),
            sender: sender.username.clone(),
            content: content.to_string(),
            media_url: None,
            parent_id,
            timestamp: Utc::now(),
        };
        rows.push(StoredMessage {
            hub_id,
            message: message.clone(),
        });

        Ok(message)
    }
}
