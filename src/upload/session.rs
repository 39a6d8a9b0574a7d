//! Upload Session Store
//!
//! Keyed storage for upload sessions:
//! - `SessionStore` trait injected into the initiator and relays
//! - In-memory implementation scoped to one process
//! - Opportunistic age-based sweep
//!
//! The in-memory store is not shared across instances and does not
//! survive a restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::types::{ChunkProgress, SessionId, UploadSession};
use crate::error::{AppError, Result};

// ============================================================================
// Store Trait
// ============================================================================

/// Session storage
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &SessionId) -> Option<UploadSession>;

    /// Insert or replace a session
    async fn set(&self, session: UploadSession);

    async fn delete(&self, id: &SessionId) -> Option<UploadSession>;

    /// Atomically acknowledge one chunk of `bytes` bytes
    ///
    /// Fails with `NotFound` for unknown or single-shot sessions, and
    /// refuses to advance past `total_chunks` or `file_size`.
    async fn record_chunk(&self, id: &SessionId, bytes: u64) -> Result<ChunkProgress>;

    /// Remove every session older than `max_age`, returning how many
    async fn sweep(&self, max_age: chrono::Duration) -> usize;

    async fn len(&self) -> usize;
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// Process-local session store
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    inner: Arc<RwLock<HashMap<SessionId, UploadSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &SessionId) -> Option<UploadSession> {
        let sessions = self.inner.read().await;
        sessions.get(id).cloned()
    }

    async fn set(&self, session: UploadSession) {
        let mut sessions = self.inner.write().await;
        sessions.insert(session.id.clone(), session);
    }

    async fn delete(&self, id: &SessionId) -> Option<UploadSession> {
        let mut sessions = self.inner.write().await;
        sessions.remove(id)
    }

    async fn record_chunk(&self, id: &SessionId, bytes: u64) -> Result<ChunkProgress> {
        let mut sessions = self.inner.write().await;

        let session = sessions
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        let file_size = session.file_size;

        let progress = session
            .chunking
            .as_mut()
            .ok_or_else(|| AppError::NotFound(format!("{} is not a chunked session", id)))?;

        if progress.uploaded_chunks >= progress.total_chunks
            || progress.uploaded_bytes + bytes > file_size
        {
            return Err(AppError::validation(
                "chunk",
                format!(
                    "session already acknowledged {} of {} chunks ({} of {} bytes)",
                    progress.uploaded_chunks, progress.total_chunks, progress.uploaded_bytes, file_size
                ),
            ));
        }

        progress.uploaded_chunks += 1;
        progress.uploaded_bytes += bytes;

        Ok(*progress)
    }

    async fn sweep(&self, max_age: chrono::Duration) -> usize {
        let now = Utc::now();
        let mut sessions = self.inner.write().await;

        let before = sessions.len();
        sessions.retain(|id, session| {
            let expired = session.is_older_than(max_age, now);
            if expired {
                tracing::debug!(
                    session_id = %id,
                    file_name = %session.file_name,
                    "Sweeping stale upload session"
                );
            }
            !expired
        });

        let count = before - sessions.len();
        if count > 0 {
            tracing::info!(count = count, "Swept stale upload sessions");
        }
        count
    }

    async fn len(&self) -> usize {
        let sessions = self.inner.read().await;
        sessions.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
