//! Upload Routes
//!
//! Relay endpoints; the raw request body is forwarded to the backend.
//!
//! Endpoints:
//! - PUT /upload?session=<id> - Single-shot upload
//! - PUT /upload-chunk?session=<id>&chunk=<index> - One chunk of a chunked upload

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        Query, State,
    },
    routing::put,
    Json, Router,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::upload::{ChunkReceipt, SessionId, UploadReceipt};

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    session: Option<String>,
    chunk: Option<String>,
}

impl UploadQuery {
    fn session_id(&self) -> Result<SessionId> {
        match self.session.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(SessionId::from(id)),
            _ => Err(AppError::validation("session", "query parameter is required")),
        }
    }

    fn from_extracted(query: std::result::Result<Query<Self>, QueryRejection>) -> Result<Self> {
        query
            .map(|Query(query)| query)
            .map_err(|e| AppError::validation("query", e.body_text()))
    }

    fn chunk_index(&self) -> Result<u64> {
        let raw = self
            .chunk
            .as_deref()
            .ok_or_else(|| AppError::validation("chunk", "query parameter is required"))?;
        raw.trim()
            .parse()
            .map_err(|_| AppError::validation("chunk", "must be a non-negative integer"))
    }
}

/// Buffered request body; oversized or unreadable bodies become validation errors
fn request_body(body: std::result::Result<Bytes, BytesRejection>) -> Result<Bytes> {
    body.map_err(|e| AppError::validation("body", e.body_text()))
}

/// Create the upload router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", put(upload_single))
        .route("/upload-chunk", put(upload_chunk))
}

/// PUT /upload?session=<id>
async fn upload_single(
    State(state): State<AppState>,
    query: std::result::Result<Query<UploadQuery>, QueryRejection>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<UploadReceipt>> {
    let session_id = UploadQuery::from_extracted(query)?.session_id()?;
    let body = request_body(body)?;
    let receipt = state.single_shot().relay(&session_id, body).await?;
    Ok(Json(receipt))
}

/// PUT /upload-chunk?session=<id>&chunk=<index>
///
/// Progress comes from server-held session state only; client-supplied
/// progress headers are ignored.
async fn upload_chunk(
    State(state): State<AppState>,
    query: std::result::Result<Query<UploadQuery>, QueryRejection>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<ChunkReceipt>> {
    let query = UploadQuery::from_extracted(query)?;
    let session_id = query.session_id()?;
    let chunk_index = query.chunk_index()?;
    let body = request_body(body)?;

    let receipt = state
        .chunk_relay()
        .relay_chunk(&session_id, chunk_index, body)
        .await?;
    Ok(Json(receipt))
}
