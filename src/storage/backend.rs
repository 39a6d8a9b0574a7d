//! Backend trait

use async_trait::async_trait;

use crate::credentials::AccessToken;
use crate::error::Result;

use super::types::{CapabilityUrl, NewObject, PutOutcome, PutRequest};

/// Resumable-upload protocol peer
///
/// Non-success statuses surface as `AppError::Backend`, an elapsed relay
/// deadline as `AppError::Timeout`. Nothing is retried here.
#[async_trait]
pub trait UploadBackend: Send + Sync {
    /// Open a resumable session and return its capability URL
    async fn open_session(&self, token: &AccessToken, object: &NewObject) -> Result<CapabilityUrl>;

    /// Write a body (or one byte range of it) to a capability URL
    async fn put(
        &self,
        token: &AccessToken,
        url: &CapabilityUrl,
        request: PutRequest,
    ) -> Result<PutOutcome>;
}
