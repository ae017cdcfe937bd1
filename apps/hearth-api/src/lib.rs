pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod realtime;
pub mod routes;

use std::sync::Arc;

use config::Config;
use db::directory::Directory;
use db::messages::MessageStore;
use realtime::bus::BroadcastBus;
use realtime::notifier::EventNotifier;
use realtime::presence::PresenceStore;

/// Shared application state available to all route handlers.
///
/// The collaborators behind the trait objects are swappable: Postgres/Redis
/// in production, in-memory in tests and single-process deployments.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn Directory>,
    pub messages: Arc<dyn MessageStore>,
    pub presence: Arc<dyn PresenceStore>,
    pub bus: Arc<dyn BroadcastBus>,
    pub notifier: EventNotifier,
    pub config: Arc<Config>,
}
