//! Storage types

use axum::body::Bytes;
use serde::{Deserialize, Serialize};

/// "Resume incomplete": range accepted, more data expected
pub const RESUME_INCOMPLETE_STATUS: u16 = 308;

/// Capability URL for one pre-allocated backend object
///
/// Grants write access on its own, so it must stay server-side. `Debug`
/// is redacted and the type does not implement `Serialize`.
#[derive(Clone, PartialEq, Eq)]
pub struct CapabilityUrl(String);

impl CapabilityUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for CapabilityUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CapabilityUrl(<redacted>)")
    }
}

/// Metadata declared when opening a resumable session
#[derive(Debug, Clone)]
pub struct NewObject {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub parent_id: Option<String>,
}

/// Inclusive byte range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for a file of `total` bytes
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

/// One relayed write
#[derive(Debug, Clone)]
pub struct PutRequest {
    pub content_type: String,
    pub body: Bytes,
    /// Range and declared total size; `None` for a single-shot write
    pub range: Option<(ByteRange, u64)>,
}

/// Backend reply to a relayed write
#[derive(Debug, Clone)]
pub enum PutOutcome {
    /// "Resume incomplete": accepted, more data expected
    Incomplete,
    /// Object created
    Complete(ObjectDescriptor),
}

/// Created object as described by the backend
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDescriptor {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

impl ObjectDescriptor {
    pub fn links(&self) -> FileLinks {
        let encoded = urlencoding::encode(&self.id);
        FileLinks {
            file_id: self.id.clone(),
            view_url: self
                .web_view_link
                .clone()
                .unwrap_or_else(|| format!("https://drive.google.com/file/d/{}/view", encoded)),
            download_url: format!("https://drive.google.com/uc?export=download&id={}", encoded),
        }
    }
}

/// Client-facing references to a created object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileLinks {
    pub file_id: String,
    pub view_url: String,
    pub download_url: String,
}
