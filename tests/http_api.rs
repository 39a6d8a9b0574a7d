//! End-to-end HTTP tests with an in-process backend

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use drive_relay_server::config::{
    AuthConfig, Config, CredentialConfig, DriveConfig, ServerConfig, UploadConfig,
};
use drive_relay_server::credentials::{AccessToken, CredentialError, CredentialProvider};
use drive_relay_server::error::{AppError, Result};
use drive_relay_server::routes;
use drive_relay_server::state::AppState;
use drive_relay_server::storage::{
    CapabilityUrl, NewObject, ObjectDescriptor, PutOutcome, PutRequest, UploadBackend,
};
use drive_relay_server::upload::InMemorySessionStore;

const SECRET: &str = "relay-secret";
const ORIGIN: &str = "https://app.example.com";
const CAPABILITY_MARKER: &str = "upload_id=capability";

struct FixedToken;

#[async_trait]
impl CredentialProvider for FixedToken {
    async fn access_token(&self) -> std::result::Result<AccessToken, CredentialError> {
        Ok(AccessToken::new("fixed", None))
    }
}

/// Accepts every range and completes once the final byte arrives
#[derive(Default)]
struct FakeDrive {
    opened: AtomicUsize,
    writes: AtomicUsize,
}

#[async_trait]
impl UploadBackend for FakeDrive {
    async fn open_session(&self, _token: &AccessToken, object: &NewObject) -> Result<CapabilityUrl> {
        if object.name == "denied.bin" {
            return Err(AppError::Backend {
                status: 403,
                body: "forbidden".to_string(),
            });
        }
        let n = self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(CapabilityUrl::new(format!(
            "https://drive.example.com/upload?{}-{}",
            CAPABILITY_MARKER, n
        )))
    }

    async fn put(
        &self,
        _token: &AccessToken,
        _url: &CapabilityUrl,
        request: PutRequest,
    ) -> Result<PutOutcome> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let done = match request.range {
            Some((range, total)) => range.end + 1 >= total,
            None => true,
        };
        if !done {
            return Ok(PutOutcome::Incomplete);
        }
        Ok(PutOutcome::Complete(ObjectDescriptor {
            id: "drive-file".to_string(),
            name: None,
            mime_type: None,
            web_view_link: None,
        }))
    }
}

fn config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        auth: AuthConfig {
            shared_secret: SECRET.to_string(),
            allowed_origins: vec![ORIGIN.to_string()],
        },
        upload: UploadConfig {
            single_shot_threshold: 1024 * 1024,
            chunk_size: 256 * 1024,
            max_file_size: Some(64 * 1024 * 1024),
            session_max_age: Duration::from_secs(3600),
            relay_timeout: Duration::from_secs(30),
        },
        drive: DriveConfig {
            api_base: "https://drive.example.com".to_string(),
            parent_folder_id: None,
        },
        credentials: CredentialConfig::Static {
            access_token: "fixed".to_string(),
        },
    }
}

fn server() -> (TestServer, Arc<FakeDrive>) {
    let backend = Arc::new(FakeDrive::default());
    let state = AppState::new(
        config(),
        Arc::new(InMemorySessionStore::new()),
        Arc::new(FixedToken),
        backend.clone(),
    );
    (TestServer::new(routes::app(state)).unwrap(), backend)
}

fn bearer(secret: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", secret)).unwrap()
}

async fn create(server: &TestServer, body: Value) -> axum_test::TestResponse {
    server
        .post("/sessions")
        .add_header(header::AUTHORIZATION, bearer(SECRET))
        .json(&body)
        .await
}

#[tokio::test]
async fn small_file_single_shot_flow() {
    let (server, backend) = server();

    let response = create(
        &server,
        json!({"fileName": "notes.txt", "fileSize": 11, "mimeType": "text/plain"}),
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let created: Value = response.json();
    assert_eq!(created["mode"], "single-shot");
    assert_eq!(created["uploadPath"], "/upload");
    let id = created["sessionId"].as_str().unwrap().to_string();

    let response = server
        .put("/upload")
        .add_query_param("session", &id)
        .bytes(Bytes::from_static(b"hello world"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let receipt: Value = response.json();
    assert_eq!(receipt["success"], true);
    assert_eq!(receipt["fileId"], "drive-file");
    assert_eq!(backend.writes.load(Ordering::SeqCst), 1);

    // Session is consumed
    let response = server
        .put("/upload")
        .add_query_param("session", &id)
        .bytes(Bytes::from_static(b"hello world"))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn chunked_flow_reports_progress() {
    let (server, _) = server();
    let chunk_size = 256 * 1024;
    let file_size = chunk_size * 4 + 100;

    let created: Value = create(
        &server,
        json!({"fileName": "clip.mp4", "fileSize": file_size, "mimeType": "video/mp4"}),
    )
    .await
    .json();
    assert_eq!(created["mode"], "chunked");
    assert_eq!(created["chunking"]["totalChunks"], 5);
    let id = created["sessionId"].as_str().unwrap().to_string();

    for index in 0..4u64 {
        let response = server
            .put("/upload-chunk")
            .add_query_param("session", &id)
            .add_query_param("chunk", index)
            .bytes(Bytes::from(vec![1u8; chunk_size]))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let receipt: Value = response.json();
        assert_eq!(receipt["uploadedChunks"], index + 1);
        assert_eq!(receipt["isComplete"], false);
        assert!(receipt.get("fileId").is_none());
    }

    let status: Value = server.get(&format!("/sessions/{}", id)).await.json();
    assert_eq!(status["chunking"]["uploadedChunks"], 4);
    assert_eq!(status["chunking"]["uploadedBytes"], chunk_size * 4);

    let response = server
        .put("/upload-chunk")
        .add_query_param("session", &id)
        .add_query_param("chunk", 4)
        .bytes(Bytes::from(vec![1u8; 100]))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let receipt: Value = response.json();
    assert_eq!(receipt["isComplete"], true);
    assert_eq!(receipt["uploadedBytes"], file_size);
    assert_eq!(receipt["totalBytes"], file_size);
    assert_eq!(receipt["fileId"], "drive-file");

    let response = server.get(&format!("/sessions/{}", id)).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chunk_index_out_of_range() {
    let (server, _) = server();
    let created: Value = create(
        &server,
        json!({"fileName": "clip.mp4", "fileSize": 2 * 1024 * 1024, "mimeType": "video/mp4"}),
    )
    .await
    .json();
    let id = created["sessionId"].as_str().unwrap().to_string();

    let response = server
        .put("/upload-chunk")
        .add_query_param("session", &id)
        .add_query_param("chunk", 8)
        .bytes(Bytes::from_static(b"x"))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(body["field"], "chunk");
}

#[tokio::test]
async fn create_requires_shared_secret() {
    let (server, backend) = server();
    let body = json!({"fileName": "a.txt", "fileSize": 10, "mimeType": "text/plain"});

    let response = server.post("/sessions").json(&body).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server
        .post("/sessions")
        .add_header(header::AUTHORIZATION, bearer("wrong"))
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"], "AUTH_ERROR");
    assert_eq!(backend.opened.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn create_validates_fields() {
    let (server, _) = server();

    for (body, field) in [
        (json!({"fileName": "a", "fileSize": -1, "mimeType": "text/plain"}), "fileSize"),
        (json!({"fileName": "a", "fileSize": "ten", "mimeType": "text/plain"}), "fileSize"),
        (json!({"fileName": "", "fileSize": 10, "mimeType": "text/plain"}), "fileName"),
        (json!({"fileName": "a", "fileSize": 10}), "mimeType"),
        (
            json!({"fileName": "a", "fileSize": 65 * 1024 * 1024, "mimeType": "text/plain"}),
            "fileSize",
        ),
    ] {
        let response = create(&server, body).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let error: Value = response.json();
        assert_eq!(error["error"], "VALIDATION_ERROR");
        assert_eq!(error["field"], field);
    }
}

#[tokio::test]
async fn backend_rejection_passes_status_through() {
    let (server, _) = server();
    let response = create(
        &server,
        json!({"fileName": "denied.bin", "fileSize": 10, "mimeType": "application/octet-stream"}),
    )
    .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["error"], "BACKEND_ERROR");
    assert_eq!(body["backendStatus"], 403);
}

#[tokio::test]
async fn unknown_session_is_rejected() {
    let (server, _) = server();

    let response = server
        .put("/upload-chunk")
        .add_query_param("session", "does-not-exist")
        .add_query_param("chunk", 0)
        .bytes(Bytes::from_static(b"x"))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "SESSION_NOT_FOUND");

    let response = server.put("/upload").bytes(Bytes::from_static(b"x")).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["field"], "session");
}

#[tokio::test]
async fn capability_url_never_leaves_the_server() {
    let (server, _) = server();

    let created = create(
        &server,
        json!({"fileName": "clip.mp4", "fileSize": 2 * 1024 * 1024, "mimeType": "video/mp4"}),
    )
    .await;
    assert!(!created.text().contains(CAPABILITY_MARKER));
    let id = created.json::<Value>()["sessionId"].as_str().unwrap().to_string();

    let status = server.get(&format!("/sessions/{}", id)).await;
    assert_eq!(status.status_code(), StatusCode::OK);
    assert!(!status.text().contains(CAPABILITY_MARKER));

    let receipt = server
        .put("/upload-chunk")
        .add_query_param("session", &id)
        .add_query_param("chunk", 0)
        .bytes(Bytes::from(vec![0u8; 256 * 1024]))
        .await;
    assert!(!receipt.text().contains(CAPABILITY_MARKER));
}

#[tokio::test]
async fn preflight_allows_configured_origin() {
    let (server, _) = server();

    let response = server
        .method(Method::OPTIONS, "/upload-chunk")
        .add_header(header::ORIGIN, HeaderValue::from_static(ORIGIN))
        .add_header(
            header::ACCESS_CONTROL_REQUEST_METHOD,
            HeaderValue::from_static("PUT"),
        )
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN), ORIGIN);
    let methods = response.header(header::ACCESS_CONTROL_ALLOW_METHODS);
    assert!(methods.to_str().unwrap().contains("PUT"));
}

#[tokio::test]
async fn preflight_ignores_unknown_origin() {
    let (server, _) = server();

    let response = server
        .method(Method::OPTIONS, "/sessions")
        .add_header(header::ORIGIN, HeaderValue::from_static("https://evil.example.com"))
        .add_header(
            header::ACCESS_CONTROL_REQUEST_METHOD,
            HeaderValue::from_static("POST"),
        )
        .await;

    assert!(response
        .headers()
        .get(HeaderName::from_static("access-control-allow-origin"))
        .is_none());
}

#[tokio::test]
async fn health_reports_active_sessions() {
    let (server, _) = server();
    create(
        &server,
        json!({"fileName": "a.txt", "fileSize": 10, "mimeType": "text/plain"}),
    )
    .await;

    let health: Value = server.get("/health").await.json();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["activeSessions"], 1);
}
