use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use jsonwebtoken::{EncodingKey, Header};
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use hearth_api::auth::AccessClaims;
use hearth_api::config::Config;
use hearth_api::db::directory::{Directory, MemoryDirectory};
use hearth_api::db::messages::{MemoryMessageStore, MessageStore};
use hearth_api::realtime::bus::{BroadcastBus, LocalBus};
use hearth_api::realtime::notifier::EventNotifier;
use hearth_api::realtime::presence::{MemoryPresence, PresenceStore};
use hearth_api::AppState;
use hearth_common::SnowflakeGenerator;

pub const TEST_JWT_SECRET: &str = "test-secret-do-not-use-in-production";
pub const TEST_SERVICE_TOKEN: &str = "svc_test_token";

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handles onto the in-memory collaborators behind an [`AppState`], so tests
/// can seed users/hubs and inspect store contents directly.
pub struct TestBackend {
    pub directory: Arc<MemoryDirectory>,
    pub messages: Arc<MemoryMessageStore>,
    pub presence: Arc<MemoryPresence>,
    pub bus: Arc<LocalBus>,
}

/// Build an AppState over in-memory collaborators.
pub fn test_state() -> (AppState, TestBackend) {
    let directory = Arc::new(MemoryDirectory::new());
    let messages = Arc::new(MemoryMessageStore::new(Arc::new(SnowflakeGenerator::new(0))));
    let presence = Arc::new(MemoryPresence::new());
    let bus = Arc::new(LocalBus::new());

    let directory_dyn: Arc<dyn Directory> = directory.clone();
    let messages_dyn: Arc<dyn MessageStore> = messages.clone();
    let presence_dyn: Arc<dyn PresenceStore> = presence.clone();
    let bus_dyn: Arc<dyn BroadcastBus> = bus.clone();

    let config = Config {
        database_url: String::new(),
        redis_url: None,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        service_token: Some(TEST_SERVICE_TOKEN.to_string()),
        worker_id: 0,
        port: 0,
    };

    let state = AppState {
        directory: directory_dyn,
        messages: messages_dyn,
        presence: presence_dyn,
        bus: bus_dyn.clone(),
        notifier: EventNotifier::new(bus_dyn),
        config: Arc::new(config),
    };

    (
        state,
        TestBackend {
            directory,
            messages,
            presence,
            bus,
        },
    )
}

/// Start an actual TCP server for WebSocket testing. Runs in the background.
pub async fn start_server(state: AppState) -> SocketAddr {
    let app = hearth_api::routes::router().with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

/// Mint an HS256 access token the way the auth collaborator would.
pub fn mint_access_token(user_id: i64, ttl_secs: i64) -> String {
    let claims = AccessClaims {
        user_id,
        exp: chrono::Utc::now().timestamp() + ttl_secs,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("mint token")
}

/// Open a websocket to a hub, with an optional bearer token.
pub async fn connect_hub(addr: SocketAddr, hub_id: i64, token: Option<&str>) -> WsClient {
    let url = match token {
        Some(token) => format!("ws://{addr}/ws/hub/{hub_id}?token={token}"),
        None => format!("ws://{addr}/ws/hub/{hub_id}"),
    };
    let (ws, _) = tokio_tungstenite::connect_async(&url).await.expect("ws connect");
    ws
}

/// Next text frame as JSON, skipping transport frames. Panics on close/EOF.
pub async fn recv_json(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let msg = time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for frame")
            .expect("stream ended")
            .expect("ws read error");

        match msg {
            tungstenite::Message::Text(text) => {
                return serde_json::from_str(&text).expect("parse frame")
            }
            tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => continue,
            other => panic!("expected text frame, got: {other:?}"),
        }
    }
}

/// Expect the connection to be refused with the given close code.
pub async fn expect_close(ws: &mut WsClient, code: u16) {
    let msg = time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timeout waiting for close")
        .expect("stream ended")
        .expect("ws read error");

    match msg {
        tungstenite::Message::Close(Some(frame)) => {
            assert_eq!(
                frame.code,
                tungstenite::protocol::frame::coding::CloseCode::from(code)
            );
        }
        tungstenite::Message::Close(None) => {
            // Also acceptable.
        }
        other => panic!("expected Close frame, got: {other:?}"),
    }
}
