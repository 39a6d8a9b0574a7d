//! Google Drive resumable-upload client
//!
//! Wraps reqwest for the two calls of the resumable protocol: session
//! initiation and range-addressed writes to the session URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, redirect, Client, Response};

use crate::config::DriveConfig;
use crate::credentials::AccessToken;
use crate::error::{AppError, Result};

use super::backend::UploadBackend;
use super::types::{
    CapabilityUrl, NewObject, ObjectDescriptor, PutOutcome, PutRequest, RESUME_INCOMPLETE_STATUS,
};

/// Fields requested on the created file
const FILE_FIELDS: &str = "id,name,mimeType,webViewLink";

/// Drive resumable-upload client
#[derive(Clone)]
pub struct DriveClient {
    client: Client,
    api_base: String,
    timeout: Duration,
}

impl DriveClient {
    /// Create a client whose calls give up after `timeout`
    pub fn new(config: &DriveConfig, timeout: Duration) -> Result<Self> {
        // 308 is a protocol status here, never a redirect to follow
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn map_transport(&self, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::Timeout {
                after_secs: self.timeout.as_secs(),
            }
        } else {
            // Strip the URL so the capability URL never reaches logs or clients
            AppError::Internal(format!("Backend request failed: {}", err.without_url()))
        }
    }

    async fn backend_error(response: Response) -> AppError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        AppError::Backend { status, body }
    }
}

#[async_trait]
impl UploadBackend for DriveClient {
    async fn open_session(&self, token: &AccessToken, object: &NewObject) -> Result<CapabilityUrl> {
        let url = format!("{}/upload/drive/v3/files", self.api_base);

        let mut metadata = serde_json::json!({
            "name": object.name,
            "mimeType": object.mime_type,
        });
        if let Some(parent) = &object.parent_id {
            metadata["parents"] = serde_json::json!([parent]);
        }

        let response = self
            .client
            .post(&url)
            .query(&[
                ("uploadType", "resumable"),
                ("supportsAllDrives", "true"),
                ("fields", FILE_FIELDS),
            ])
            .bearer_auth(token.secret())
            .header("X-Upload-Content-Type", &object.mime_type)
            .header("X-Upload-Content-Length", object.size.to_string())
            .json(&metadata)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response).await);
        }

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        match location {
            Some(location) => Ok(CapabilityUrl::new(location)),
            None => Err(AppError::Backend {
                status,
                body: "missing Location header in resumable session response".to_string(),
            }),
        }
    }

    async fn put(
        &self,
        token: &AccessToken,
        url: &CapabilityUrl,
        request: PutRequest,
    ) -> Result<PutOutcome> {
        let mut builder = self
            .client
            .put(url.as_str())
            .bearer_auth(token.secret())
            .header(header::CONTENT_TYPE, &request.content_type);

        if let Some((range, total)) = request.range {
            builder = builder.header(header::CONTENT_RANGE, range.content_range(total));
        }

        let response = builder
            .body(request.body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if status.as_u16() == RESUME_INCOMPLETE_STATUS {
            return Ok(PutOutcome::Incomplete);
        }

        if !status.is_success() {
            return Err(Self::backend_error(response).await);
        }

        let descriptor: ObjectDescriptor = response.json().await.map_err(|e| AppError::Backend {
            status: status.as_u16(),
            body: format!("unreadable file descriptor: {}", e.without_url()),
        })?;

        Ok(PutOutcome::Complete(descriptor))
    }
}
