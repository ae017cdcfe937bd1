pub mod health;
pub mod internal;

use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(internal::router())
        .merge(crate::realtime::server::router())
}
