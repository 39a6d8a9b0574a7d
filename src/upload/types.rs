//! Upload types for the relayed resumable protocol

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::{CapabilityUrl, FileLinks};

// ============================================================================
// Session Types
// ============================================================================

/// Opaque client-facing session identifier
///
/// Drawn from a v4 UUID (122 random bits), never from the capability URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the client transfers the body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadMode {
    /// Whole body in one relayed PUT
    SingleShot,
    /// Ordered chunk PUTs
    Chunked,
}

impl UploadMode {
    /// Route the client uses for this mode
    pub fn upload_path(&self) -> &'static str {
        match self {
            UploadMode::SingleShot => "/upload",
            UploadMode::Chunked => "/upload-chunk",
        }
    }
}

/// Chunked-upload progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkProgress {
    pub chunk_size: u64,
    pub total_chunks: u64,
    pub uploaded_chunks: u64,
    pub uploaded_bytes: u64,
}

impl ChunkProgress {
    pub fn is_complete(&self) -> bool {
        self.uploaded_chunks >= self.total_chunks
    }
}

/// Upload session state
///
/// Not `Serialize`: the capability URL must never leave the server.
#[derive(Debug, Clone)]
pub struct UploadSession {
    /// Client-facing id
    pub id: SessionId,

    /// Backend capability URL
    pub upload_url: CapabilityUrl,

    /// Original file name
    pub file_name: String,

    /// MIME type declared at creation
    pub mime_type: String,

    /// Total file size in bytes
    pub file_size: u64,

    /// Session creation time
    pub created_at: DateTime<Utc>,

    /// `None` for single-shot sessions
    pub chunking: Option<ChunkProgress>,
}

impl UploadSession {
    pub fn mode(&self) -> UploadMode {
        if self.chunking.is_some() {
            UploadMode::Chunked
        } else {
            UploadMode::SingleShot
        }
    }

    /// Whether the session is older than `max_age` at `now`
    pub fn is_older_than(&self, max_age: chrono::Duration, now: DateTime<Utc>) -> bool {
        now - self.created_at > max_age
    }
}

// ============================================================================
// Request / Response Types
// ============================================================================

/// Request to create an upload session
///
/// Fields stay loosely typed so bad input is reported as a validation
/// error naming the field rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub file_name: Option<serde_json::Value>,

    #[serde(default)]
    pub file_size: Option<serde_json::Value>,

    #[serde(default)]
    pub mime_type: Option<serde_json::Value>,
}

/// Chunk plan shared with the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPlanView {
    pub chunk_size: u64,
    pub total_chunks: u64,
}

/// Response to session creation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    pub session_id: SessionId,
    pub mode: UploadMode,
    pub upload_path: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunking: Option<ChunkPlanView>,
}

/// Outcome of one relayed chunk
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkReceipt {
    pub success: bool,
    pub chunk_index: u64,
    pub uploaded_chunks: u64,
    pub total_chunks: u64,
    pub uploaded_bytes: u64,
    pub total_bytes: u64,
    pub is_complete: bool,
    #[serde(flatten)]
    pub file: Option<FileLinks>,
}

/// Outcome of a single-shot relay
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub success: bool,
    #[serde(flatten)]
    pub file: FileLinks,
}

/// Progress snapshot of a live session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusView {
    pub session_id: SessionId,
    pub mode: UploadMode,
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunking: Option<ChunkProgress>,
}

impl From<&UploadSession> for SessionStatusView {
    fn from(session: &UploadSession) -> Self {
        Self {
            session_id: session.id.clone(),
            mode: session.mode(),
            file_name: session.file_name.clone(),
            file_size: session.file_size,
            mime_type: session.mime_type.clone(),
            created_at: session.created_at,
            chunking: session.chunking,
        }
    }
}
