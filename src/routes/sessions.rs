//! Session Routes
//!
//! Endpoints:
//! - POST /sessions - Open a backend upload session (shared-secret protected)
//! - GET /sessions/:session_id - Progress snapshot of a live session

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap},
    routing::{get, post},
    Json, Router,
};

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::upload::{session_status, CreateSessionRequest, CreatedSession, SessionId, SessionStatusView};

/// Create the sessions router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/:session_id", get(get_session))
}

/// POST /sessions
async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<Json<CreatedSession>> {
    authorize(&headers, &state.config().auth.shared_secret)?;

    let Json(request) = payload.map_err(|e| AppError::validation("body", e.body_text()))?;
    let created = state.initiator().create_session(&request).await?;

    Ok(Json(created))
}

/// GET /sessions/:session_id
async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionStatusView>> {
    let status = session_status(state.store(), &SessionId::from(session_id)).await?;
    Ok(Json(status))
}

/// Check `Authorization: Bearer <shared secret>`
fn authorize(headers: &HeaderMap, secret: &str) -> Result<()> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| AppError::Auth("missing bearer token".to_string()))?;

    if secret.is_empty() || !constant_time_eq(presented.as_bytes(), secret.as_bytes()) {
        return Err(AppError::Auth("shared secret mismatch".to_string()));
    }
    Ok(())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
