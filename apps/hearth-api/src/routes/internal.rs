//! Internal notify surface.
//!
//! The CRUD service calls these after committing an event change so the
//! notifier can fan the fact out to the hub's connected clients. Guarded by
//! the shared `SERVICE_TOKEN`; disabled entirely when it isn't configured.

use axum::extract::{Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/internal/hubs/{hub_id}/events/{event_id}/attendance",
            post(attendance_changed),
        )
        .route("/internal/hubs/{hub_id}/events/notify", post(event_saved))
}

#[derive(Debug, Deserialize)]
pub struct AttendanceRequest {
    pub attending: bool,
}

#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    pub event: Value,
}

fn check_service_token(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.config.service_token.as_deref() else {
        return Err(ApiError::forbidden("Internal API disabled"));
    };

    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if provided == Some(expected) {
        Ok(())
    } else {
        Err(ApiError::unauthorized("Invalid service token"))
    }
}

async fn attendance_changed(
    State(state): State<AppState>,
    Path((hub_id, event_id)): Path<(i64, i64)>,
    headers: HeaderMap,
    Json(body): Json<AttendanceRequest>,
) -> Result<StatusCode, ApiError> {
    check_service_token(&state, &headers)?;
    state
        .notifier
        .attendance_changed(hub_id, event_id, body.attending)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

async fn event_saved(
    State(state): State<AppState>,
    Path(hub_id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<NotifyRequest>,
) -> Result<StatusCode, ApiError> {
    check_service_token(&state, &headers)?;
    state.notifier.event_saved(hub_id, body.event).await?;
    Ok(StatusCode::ACCEPTED)
}
