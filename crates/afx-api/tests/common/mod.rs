//! Shared fixtures: in-memory backends, a temp-dir blob store and test tokens.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use tempfile::TempDir;
use tower::ServiceExt;

use afx_api::{create_router, ApiConfig, AppState, AudioService, Claims};
use afx_media::{MediaError, MediaResult, TransformTool};
use afx_models::EffectParams;
use afx_queue::MemoryJobQueue;
use afx_storage::{BlobStore, DeliveryTokens, FileRefs, MemoryHistory, MemoryStore};

pub const SECRET: &str = "test-secret";
pub const BOUNDARY: &str = "afx-test-boundary";

pub struct TestApp {
    pub dir: TempDir,
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub queue: Arc<MemoryJobQueue>,
    pub history: Arc<MemoryHistory>,
    pub blobs: BlobStore,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn test_app(token_ttl: Duration) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let blobs = BlobStore::new(dir.path().join("originals"), dir.path().join("processed"));
    std::fs::create_dir_all(blobs.originals_dir()).unwrap();
    std::fs::create_dir_all(blobs.processed_dir()).unwrap();

    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryJobQueue::new(store.clone(), Duration::from_secs(60)));
    let history = Arc::new(MemoryHistory::new());

    let audio = AudioService::new(
        blobs.clone(),
        FileRefs::new(store.clone()),
        DeliveryTokens::new(store.clone(), token_ttl, false),
        history.clone(),
        queue.clone(),
        Duration::from_secs(3600),
    );
    let config = ApiConfig {
        jwt_secret: SECRET.to_string(),
        ..Default::default()
    };
    let state = AppState::from_parts(config, audio, store.clone());

    TestApp {
        dir,
        router: create_router(state, None),
        store,
        queue,
        history,
        blobs,
    }
}

/// `Authorization` header value for `user_id`.
pub fn bearer(user_id: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as u64,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {token}")
}

pub fn get(uri: &str, user_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(user) = user_id {
        builder = builder.header(header::AUTHORIZATION, bearer(user));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn upload_request(user_id: Option<&str>, filename: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: audio/mpeg\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri("/files/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(user) = user_id {
        builder = builder.header(header::AUTHORIZATION, bearer(user));
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn process_request(user_id: &str, file_id: &str, effect: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/process?file_id={file_id}"))
        .header(header::AUTHORIZATION, bearer(user_id))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(effect.to_string()))
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Upload `bytes` as `user_id` and return the file id.
pub async fn upload(app: &TestApp, user_id: &str, filename: &str, bytes: &[u8]) -> String {
    let response = app.send(upload_request(Some(user_id), filename, bytes)).await;
    assert_eq!(response.status(), 200);
    json_body(response).await["file_id"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Transform tool that writes fixed bytes, or fails like ffmpeg exiting 1.
pub struct ScriptedTool {
    failure: Option<String>,
    calls: AtomicUsize,
}

pub const PROCESSED_BYTES: &[u8] = b"processed-audio";

impl ScriptedTool {
    pub fn succeeding() -> Self {
        Self {
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(stderr: &str) -> Self {
        Self {
            failure: Some(stderr.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransformTool for ScriptedTool {
    async fn transform(&self, input: &Path, output: &Path, _params: &EffectParams) -> MediaResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(stderr) = &self.failure {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(stderr.clone()),
                Some(1),
            ));
        }
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }
        tokio::fs::write(output, PROCESSED_BYTES).await?;
        Ok(())
    }
}
