//! Session Initiator
//!
//! Validates an upload request, opens a resumable session with the
//! backend and records it under a fresh opaque id.

use std::sync::Arc;

use chrono::Utc;

use super::plan::ChunkPlan;
use super::session::SessionStore;
use super::types::{
    ChunkPlanView, ChunkProgress, CreateSessionRequest, CreatedSession, SessionId, UploadSession,
};
use crate::config::UploadConfig;
use crate::credentials::CredentialProvider;
use crate::error::{AppError, Result};
use crate::storage::{NewObject, UploadBackend};

/// Largest integer a JSON double represents exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Validated upload request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: String,
}

impl UploadRequest {
    /// Check field types and bounds, naming the first offending field
    pub fn validate(request: &CreateSessionRequest, max_file_size: Option<u64>) -> Result<Self> {
        let file_name = non_empty_string("fileName", request.file_name.as_ref())?;
        let mime_type = non_empty_string("mimeType", request.mime_type.as_ref())?;
        let file_size = positive_integer("fileSize", request.file_size.as_ref())?;

        if let Some(max) = max_file_size {
            if file_size > max {
                return Err(AppError::validation(
                    "fileSize",
                    format!("{} bytes exceeds the maximum of {} bytes", file_size, max),
                ));
            }
        }

        Ok(Self {
            file_name,
            file_size,
            mime_type,
        })
    }
}

fn non_empty_string(field: &'static str, value: Option<&serde_json::Value>) -> Result<String> {
    match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(AppError::validation(field, "must be a non-empty string")),
    }
}

fn positive_integer(field: &'static str, value: Option<&serde_json::Value>) -> Result<u64> {
    let number = match value {
        Some(serde_json::Value::Number(n)) => n,
        _ => return Err(AppError::validation(field, "must be a positive number")),
    };

    if let Some(n) = number.as_u64() {
        return if n > 0 {
            Ok(n)
        } else {
            Err(AppError::validation(field, "must be a positive number"))
        };
    }

    // Whole-valued doubles such as 1024.0
    match number.as_f64() {
        Some(f) if f > 0.0 && f.fract() == 0.0 && f <= MAX_SAFE_INTEGER => Ok(f as u64),
        Some(f) if f > 0.0 && f.fract() != 0.0 => {
            Err(AppError::validation(field, "must be a whole number of bytes"))
        }
        _ => Err(AppError::validation(field, "must be a positive number")),
    }
}

/// Opens backend sessions and persists them
pub struct SessionInitiator {
    store: Arc<dyn SessionStore>,
    credentials: Arc<dyn CredentialProvider>,
    backend: Arc<dyn UploadBackend>,
    config: UploadConfig,
    parent_folder_id: Option<String>,
}

impl SessionInitiator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        credentials: Arc<dyn CredentialProvider>,
        backend: Arc<dyn UploadBackend>,
        config: UploadConfig,
        parent_folder_id: Option<String>,
    ) -> Self {
        Self {
            store,
            credentials,
            backend,
            config,
            parent_folder_id,
        }
    }

    pub async fn create_session(&self, request: &CreateSessionRequest) -> Result<CreatedSession> {
        let upload = UploadRequest::validate(request, self.config.max_file_size)?;

        let max_age = chrono::Duration::from_std(self.config.session_max_age)
            .map_err(|e| AppError::Internal(format!("Invalid session max age: {}", e)))?;
        self.store.sweep(max_age).await;

        let plan = if upload.file_size > self.config.single_shot_threshold {
            let plan = ChunkPlan::new(upload.file_size, self.config.chunk_size)
                .ok_or_else(|| AppError::Internal("Chunk size must be positive".to_string()))?;
            Some(plan)
        } else {
            None
        };

        let token = self.credentials.access_token().await?;

        let upload_url = self
            .backend
            .open_session(
                &token,
                &NewObject {
                    name: upload.file_name.clone(),
                    mime_type: upload.mime_type.clone(),
                    size: upload.file_size,
                    parent_id: self.parent_folder_id.clone(),
                },
            )
            .await?;

        let session = UploadSession {
            id: SessionId::generate(),
            upload_url,
            file_name: upload.file_name,
            mime_type: upload.mime_type,
            file_size: upload.file_size,
            created_at: Utc::now(),
            chunking: plan.map(|plan| ChunkProgress {
                chunk_size: plan.chunk_size,
                total_chunks: plan.total_chunks,
                uploaded_chunks: 0,
                uploaded_bytes: 0,
            }),
        };

        let created = CreatedSession {
            session_id: session.id.clone(),
            mode: session.mode(),
            upload_path: session.mode().upload_path(),
            chunking: plan.map(|plan| ChunkPlanView {
                chunk_size: plan.chunk_size,
                total_chunks: plan.total_chunks,
            }),
        };

        tracing::info!(
            session_id = %session.id,
            file_name = %session.file_name,
            file_size = session.file_size,
            mode = ?created.mode,
            total_chunks = plan.map(|p| p.total_chunks),
            "Created upload session"
        );

        self.store.set(session).await;

        Ok(created)
    }
}
