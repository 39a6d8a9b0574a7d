//! Chunk and Single-Shot Relays
//!
//! Forward client bytes to the session's capability URL. The backend
//! enforces range ordering; locally only the chunk index is bounds
//! checked. Nothing here retries: a `Timeout` tells the caller the same
//! range may be resent, any other failure is surfaced as-is.

use std::sync::Arc;

use axum::body::Bytes;

use super::plan::ChunkPlan;
use super::session::SessionStore;
use super::types::{
    ChunkProgress, ChunkReceipt, SessionId, SessionStatusView, UploadReceipt, UploadSession,
};
use crate::credentials::CredentialProvider;
use crate::error::{AppError, Result};
use crate::storage::{PutOutcome, PutRequest, UploadBackend, RESUME_INCOMPLETE_STATUS};

async fn load_session(store: &dyn SessionStore, id: &SessionId) -> Result<UploadSession> {
    store
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(id.to_string()))
}

/// Progress snapshot for a live session
pub async fn session_status(store: &dyn SessionStore, id: &SessionId) -> Result<SessionStatusView> {
    let session = load_session(store, id).await?;
    Ok(SessionStatusView::from(&session))
}

// ============================================================================
// Chunk Relay
// ============================================================================

/// Relays one chunk at a time for chunked sessions
pub struct ChunkRelay {
    store: Arc<dyn SessionStore>,
    credentials: Arc<dyn CredentialProvider>,
    backend: Arc<dyn UploadBackend>,
}

impl ChunkRelay {
    pub fn new(
        store: Arc<dyn SessionStore>,
        credentials: Arc<dyn CredentialProvider>,
        backend: Arc<dyn UploadBackend>,
    ) -> Self {
        Self {
            store,
            credentials,
            backend,
        }
    }

    pub async fn relay_chunk(
        &self,
        id: &SessionId,
        chunk_index: u64,
        body: Bytes,
    ) -> Result<ChunkReceipt> {
        let session = load_session(self.store.as_ref(), id).await?;
        let progress = session
            .chunking
            .ok_or_else(|| AppError::NotFound(format!("{} is not a chunked session", id)))?;

        let plan = ChunkPlan::new(session.file_size, progress.chunk_size)
            .ok_or_else(|| AppError::Internal(format!("Session {} has an empty chunk plan", id)))?;
        let range = plan.range(chunk_index).ok_or_else(|| {
            AppError::validation(
                "chunk",
                format!("index {} is outside 0..{}", chunk_index, plan.total_chunks),
            )
        })?;

        if body.len() as u64 != range.len() {
            // The backend rejects the range itself
            tracing::warn!(
                session_id = %id,
                chunk_index = chunk_index,
                expected = range.len(),
                actual = body.len(),
                "Chunk length differs from plan"
            );
        }

        // Fresh token per chunk: a long upload can outlive one token
        let token = self.credentials.access_token().await?;

        tracing::debug!(
            session_id = %id,
            chunk_index = chunk_index,
            range = %range.content_range(session.file_size),
            "Relaying chunk"
        );

        let outcome = self
            .backend
            .put(
                &token,
                &session.upload_url,
                PutRequest {
                    content_type: session.mime_type.clone(),
                    body,
                    range: Some((range, session.file_size)),
                },
            )
            .await?;

        let descriptor = match outcome {
            PutOutcome::Complete(descriptor) => Some(descriptor),
            PutOutcome::Incomplete
                if plan.is_last(chunk_index)
                    || progress.uploaded_chunks + 1 >= progress.total_chunks =>
            {
                // Acknowledging this chunk would finish the plan without a file
                return Err(AppError::Backend {
                    status: RESUME_INCOMPLETE_STATUS,
                    body: format!(
                        "backend still expects data after chunk {} of {}",
                        chunk_index, plan.total_chunks
                    ),
                });
            }
            PutOutcome::Incomplete => None,
        };

        let updated = match &descriptor {
            // The backend holds the file now; report the whole plan as
            // acknowledged even if the session was swept mid-flight
            Some(_) => {
                if !plan.is_last(chunk_index) {
                    tracing::warn!(
                        session_id = %id,
                        chunk_index = chunk_index,
                        total_chunks = plan.total_chunks,
                        "Backend finished the upload before the last chunk"
                    );
                }
                ChunkProgress {
                    chunk_size: plan.chunk_size,
                    total_chunks: plan.total_chunks,
                    uploaded_chunks: plan.total_chunks,
                    uploaded_bytes: plan.file_size,
                }
            }
            None => self.store.record_chunk(id, range.len()).await?,
        };
        let is_complete = updated.is_complete();

        let file = descriptor.map(|d| d.links());
        if is_complete {
            self.store.delete(id).await;
            tracing::info!(
                session_id = %id,
                file_name = %session.file_name,
                file_id = file.as_ref().map(|f| f.file_id.as_str()),
                total_chunks = updated.total_chunks,
                "Chunked upload complete"
            );
        } else {
            tracing::debug!(
                session_id = %id,
                chunk_index = chunk_index,
                uploaded_chunks = updated.uploaded_chunks,
                total_chunks = updated.total_chunks,
                "Chunk accepted"
            );
        }

        Ok(ChunkReceipt {
            success: true,
            chunk_index,
            uploaded_chunks: updated.uploaded_chunks,
            total_chunks: updated.total_chunks,
            uploaded_bytes: updated.uploaded_bytes,
            total_bytes: session.file_size,
            is_complete,
            file,
        })
    }
}

// ============================================================================
// Single-Shot Relay
// ============================================================================

/// Relays a whole small file in one write
pub struct SingleShotRelay {
    store: Arc<dyn SessionStore>,
    credentials: Arc<dyn CredentialProvider>,
    backend: Arc<dyn UploadBackend>,
}

impl SingleShotRelay {
    pub fn new(
        store: Arc<dyn SessionStore>,
        credentials: Arc<dyn CredentialProvider>,
        backend: Arc<dyn UploadBackend>,
    ) -> Self {
        Self {
            store,
            credentials,
            backend,
        }
    }

    pub async fn relay(&self, id: &SessionId, body: Bytes) -> Result<UploadReceipt> {
        let session = load_session(self.store.as_ref(), id).await?;
        if session.chunking.is_some() {
            return Err(AppError::NotFound(format!("{} is a chunked session", id)));
        }

        if body.len() as u64 != session.file_size {
            tracing::warn!(
                session_id = %id,
                expected = session.file_size,
                actual = body.len(),
                "Upload length differs from declared size"
            );
        }

        let token = self.credentials.access_token().await?;

        let outcome = self
            .backend
            .put(
                &token,
                &session.upload_url,
                PutRequest {
                    content_type: session.mime_type.clone(),
                    body,
                    range: None,
                },
            )
            .await?;

        let descriptor = match outcome {
            PutOutcome::Complete(descriptor) => descriptor,
            PutOutcome::Incomplete => {
                return Err(AppError::Backend {
                    status: RESUME_INCOMPLETE_STATUS,
                    body: "backend expects more data than the declared size".to_string(),
                });
            }
        };

        self.store.delete(id).await;

        let file = descriptor.links();
        tracing::info!(
            session_id = %id,
            file_name = %session.file_name,
            file_id = %file.file_id,
            "Single-shot upload complete"
        );

        Ok(UploadReceipt {
            success: true,
            file,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
