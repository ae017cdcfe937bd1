//! User / hub / membership lookups consumed by the realtime core.
//!
//! The CRUD service owns these tables; this side only reads them. Backed by
//! Postgres in production and an in-memory map in tests and single-process
//! setups.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use diesel::prelude::*;
use diesel::result::OptionalExtension;

use crate::db::pool::DbPool;
use crate::db::schema::{hub_memberships, hubs, users};
use crate::error::ApiError;
use crate::models::hub::{Hub, HubMembership};
use crate::models::user::User;

#[async_trait]
pub trait Directory: Send + Sync {
    /// Look up a user by id.
    async fn find_user(&self, user_id: i64) -> Result<Option<User>, ApiError>;

    /// The membership gate: true iff the user owns the hub or holds an
    /// approved membership. Callers must re-check on every admission decision
    /// rather than caching the answer — approval state changes between calls.
    async fn is_admitted(&self, user_id: i64, hub_id: i64) -> Result<bool, ApiError>;
}

// ---------------------------------------------------------------------------
// Postgres implementation
// ---------------------------------------------------------------------------

pub struct DieselDirectory {
    db: DbPool,
}

impl DieselDirectory {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Directory for DieselDirectory {
    async fn find_user(&self, user_id: i64) -> Result<Option<User>, ApiError> {
        let mut conn = self.db.get().await?;
        let user: Option<User> = diesel_async::RunQueryDsl::get_result(
            users::table.find(user_id).select(User::as_select()),
            &mut conn,
        )
        .await
        .optional()?;
        Ok(user)
    }

    async fn is_admitted(&self, user_id: i64, hub_id: i64) -> Result<bool, ApiError> {
        let mut conn = self.db.get().await?;

        let hub: Option<Hub> = diesel_async::RunQueryDsl::get_result(
            hubs::table.find(hub_id).select(Hub::as_select()),
            &mut conn,
        )
        .await
        .optional()?;

        let Some(hub) = hub else {
            // Unknown hub — not admitted, same refusal as a missing membership.
            return Ok(false);
        };

        if hub.admin_id == user_id {
            return Ok(true);
        }

        let membership: Option<HubMembership> = diesel_async::RunQueryDsl::get_result(
            hub_memberships::table
                .filter(hub_memberships::hub_id.eq(hub_id))
                .filter(hub_memberships::user_id.eq(user_id))
                .filter(hub_memberships::is_approved.eq(true))
                .select(HubMembership::as_select()),
            &mut conn,
        )
        .await
        .optional()?;

        Ok(membership.is_some())
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation (tests / single-process fallback)
// ---------------------------------------------------------------------------

pub struct MemoryDirectory {
    users: DashMap<i64, User>,
    /// hub id → owning admin id.
    hubs: DashMap<i64, i64>,
    /// (user id, hub id) → approved.
    memberships: DashMap<(i64, i64), bool>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            hubs: DashMap::new(),
            memberships: DashMap::new(),
        }
    }

    pub fn insert_user(&self, id: i64, username: &str) {
        self.users.insert(
            id,
            User {
                id,
                username: username.to_string(),
                created_at: Utc::now(),
            },
        );
    }

    pub fn insert_hub(&self, hub_id: i64, admin_id: i64) {
        self.hubs.insert(hub_id, admin_id);
    }

    pub fn set_membership(&self, user_id: i64, hub_id: i64, approved: bool) {
        self.memberships.insert((user_id, hub_id), approved);
    }

    pub fn remove_membership(&self, user_id: i64, hub_id: i64) {
        self.memberships.remove(&(user_id, hub_id));
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn find_user(&self, user_id: i64) -> Result<Option<User>, ApiError> {
        Ok(self.users.get(&user_id).map(|u| u.value().clone()))
    }

    async fn is_admitted(&self, user_id: i64, hub_id: i64) -> Result<bool, ApiError> {
        let Some(admin_id) = self.hubs.get(&hub_id).map(|a| *a) else {
            return Ok(false);
        };
        if admin_id == user_id {
            return Ok(true);
        }
        Ok(self
            .memberships
            .get(&(user_id, hub_id))
            .map(|approved| *approved)
            .unwrap_or(false))
    }
}
