use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hearth_api::config::Config;
use hearth_api::db::directory::{DieselDirectory, Directory};
use hearth_api::db::messages::{DieselMessageStore, MessageStore};
use hearth_api::realtime::bus::{BroadcastBus, LocalBus, RedisBus};
use hearth_api::realtime::notifier::EventNotifier;
use hearth_api::realtime::presence::{MemoryPresence, PresenceStore, RedisPresence};
use hearth_api::AppState;
use hearth_common::SnowflakeGenerator;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing — env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    // Connect to PostgreSQL.
    let db = hearth_api::db::pool::connect(&config.database_url).await;
    let snowflake = Arc::new(SnowflakeGenerator::new(config.worker_id));

    let directory: Arc<dyn Directory> = Arc::new(DieselDirectory::new(db.clone()));
    let messages: Arc<dyn MessageStore> = Arc::new(DieselMessageStore::new(db, snowflake));

    // Redis backs presence and fan-out across instances; without it both are
    // process-local, which only works for a single instance.
    let (presence, bus): (Arc<dyn PresenceStore>, Arc<dyn BroadcastBus>) =
        match config.redis_url.as_deref() {
            Some(url) => {
                let presence = RedisPresence::connect(url)
                    .await
                    .expect("redis presence store");
                let bus = RedisBus::connect(url).await.expect("redis broadcast bus");
                tracing::info!("redis presence and fan-out connected");
                (Arc::new(presence), Arc::new(bus))
            }
            None => {
                tracing::warn!("REDIS_URL not set; presence and fan-out are process-local");
                (Arc::new(MemoryPresence::new()), Arc::new(LocalBus::new()))
            }
        };

    let notifier = EventNotifier::new(bus.clone());

    let state = AppState {
        directory,
        messages,
        presence,
        bus,
        notifier,
        config: Arc::new(config),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(hearth_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "hearth-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
