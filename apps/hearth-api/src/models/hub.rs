use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::db::schema::{hub_memberships, hubs};

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = hubs)]
pub struct Hub {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Owning admin; always admitted to the hub's group.
    pub admin_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = hub_memberships)]
pub struct HubMembership {
    pub id: i64,
    pub user_id: i64,
    pub hub_id: i64,
    pub is_approved: bool,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}
