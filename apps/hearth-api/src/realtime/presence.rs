//! Per-hub online-presence sets.
//!
//! Presence is keyed by username, so concurrent multi-device connections
//! collapse to one entry. Backed by Redis in production — the sets have to
//! be visible to every server instance and survive process restarts — and by
//! an in-memory map in tests and single-process setups.

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashSet;

use crate::error::ApiError;

#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Mark a user online in a hub. Idempotent: re-adding a present user is
    /// a no-op.
    async fn add(&self, hub_id: i64, username: &str) -> Result<(), ApiError>;

    /// Mark a user offline in a hub. Removing an absent entry is a no-op,
    /// not an error — disconnect may race with a failed connect.
    async fn remove(&self, hub_id: i64, username: &str) -> Result<(), ApiError>;

    /// The hub's current online usernames, sorted.
    async fn members(&self, hub_id: i64) -> Result<Vec<String>, ApiError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation (tests / single-process fallback)
// ---------------------------------------------------------------------------

pub struct MemoryPresence {
    sets: DashMap<i64, HashSet<String>>,
}

impl MemoryPresence {
    pub fn new() -> Self {
        Self {
            sets: DashMap::new(),
        }
    }
}

impl Default for MemoryPresence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceStore for MemoryPresence {
    async fn add(&self, hub_id: i64, username: &str) -> Result<(), ApiError> {
        self.sets
            .entry(hub_id)
            .or_default()
            .insert(username.to_string());
        Ok(())
    }

    async fn remove(&self, hub_id: i64, username: &str) -> Result<(), ApiError> {
        if let Some(mut set) = self.sets.get_mut(&hub_id) {
            set.remove(username);
        }
        Ok(())
    }

    async fn members(&self, hub_id: i64) -> Result<Vec<String>, ApiError> {
        let mut names: Vec<String> = self
            .sets
            .get(&hub_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        names.sort();
        Ok(names)
    }
}

// ---------------------------------------------------------------------------
// Redis implementation
// ---------------------------------------------------------------------------

pub struct RedisPresence {
    conn: ConnectionManager,
}

impl RedisPresence {
    pub async fn connect(url: &str) -> Result<Self, ApiError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    fn key(hub_id: i64) -> String {
        format!("presence:hub:{hub_id}")
    }
}

#[async_trait]
impl PresenceStore for RedisPresence {
    async fn add(&self, hub_id: i64, username: &str) -> Result<(), ApiError> {
        let mut conn = self.conn.clone();
        conn.sadd::<_, _, ()>(Self::key(hub_id), username).await?;
        Ok(())
    }

    async fn remove(&self, hub_id: i64, username: &str) -> Result<(), ApiError> {
        let mut conn = self.conn.clone();
        conn.srem::<_, _, ()>(Self::key(hub_id), username).await?;
        Ok(())
    }

    async fn members(&self, hub_id: i64) -> Result<Vec<String>, ApiError> {
        let mut conn = self.conn.clone();
        let mut names: Vec<String> = conn.smembers(Self::key(hub_id)).await?;
        names.sort();
        Ok(names)
    }
}
