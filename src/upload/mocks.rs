//! Scripted collaborators for relay and initiator tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::credentials::{AccessToken, CredentialError, CredentialProvider};
use crate::error::{AppError, Result};
use crate::storage::{
    ByteRange, CapabilityUrl, NewObject, ObjectDescriptor, PutOutcome, PutRequest, UploadBackend,
};

/// Token source that succeeds or fails on every call
pub struct MockCredentials {
    fail: bool,
    calls: AtomicUsize,
}

impl MockCredentials {
    pub fn ok() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for MockCredentials {
    async fn access_token(&self) -> std::result::Result<AccessToken, CredentialError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CredentialError::Rejected {
                status: 400,
                body: "invalid_grant".to_string(),
            });
        }
        Ok(AccessToken::new(format!("token-{}", n), None))
    }
}

/// What the backend saw for one PUT
#[derive(Debug, Clone)]
pub struct RecordedPut {
    pub range: Option<(ByteRange, u64)>,
    pub body_len: usize,
    pub content_type: String,
}

/// Backend answering PUTs from a script
pub struct MockBackend {
    open_result: Mutex<Option<AppError>>,
    opened: Mutex<Vec<NewObject>>,
    script: Mutex<VecDeque<Result<PutOutcome>>>,
    puts: Mutex<Vec<RecordedPut>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            open_result: Mutex::new(None),
            opened: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            puts: Mutex::new(Vec::new()),
        }
    }

    pub fn complete(id: &str) -> PutOutcome {
        PutOutcome::Complete(ObjectDescriptor {
            id: id.to_string(),
            name: None,
            mime_type: None,
            web_view_link: None,
        })
    }

    /// Make the next `open_session` fail
    pub fn fail_open(&self, err: AppError) {
        *self.open_result.lock().unwrap() = Some(err);
    }

    pub fn push_put(&self, outcome: Result<PutOutcome>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn opened(&self) -> Vec<NewObject> {
        self.opened.lock().unwrap().clone()
    }

    pub fn puts(&self) -> Vec<RecordedPut> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadBackend for MockBackend {
    async fn open_session(&self, _token: &AccessToken, object: &NewObject) -> Result<CapabilityUrl> {
        if let Some(err) = self.open_result.lock().unwrap().take() {
            return Err(err);
        }
        let mut opened = self.opened.lock().unwrap();
        opened.push(object.clone());
        Ok(CapabilityUrl::new(format!(
            "https://backend.example.com/upload?upload_id=secret-{}",
            opened.len()
        )))
    }

    async fn put(
        &self,
        _token: &AccessToken,
        _url: &CapabilityUrl,
        request: PutRequest,
    ) -> Result<PutOutcome> {
        self.puts.lock().unwrap().push(RecordedPut {
            range: request.range,
            body_len: request.body.len(),
            content_type: request.content_type.clone(),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(PutOutcome::Incomplete))
    }
}
