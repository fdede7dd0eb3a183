#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use codegate::completion::CompletionClient;
use codegate::config::{CompletionConfig, SandboxConfig};
use codegate::knowledge::{KnowledgeBase, LocalVectorStore};
use codegate::sandbox::SandboxRunner;
use codegate::server::{self, AppState};
use codegate::sinks::CollectingEventSink;

/// Completion endpoint nothing listens on.
pub const UNREACHABLE: &str = "http://127.0.0.1:1/api/generate";

/// Application state wired to local, throwaway backends.
///
/// - completion requests go to `completion_endpoint`
/// - the vector store lives in a temp dir
/// - snippets run on this machine through `bash -c`
pub struct TestApp {
    pub state: Arc<AppState>,
    pub events: Arc<CollectingEventSink>,
    work: PathBuf,
    _dir: TempDir,
}

impl TestApp {
    pub fn router(&self) -> Router {
        server::router(self.state.clone())
    }

    /// Directory snippets are staged in.
    pub fn work_dir(&self) -> &Path {
        &self.work
    }
}

pub fn build_test_app(completion_endpoint: &str, api_key: Option<&str>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    std::fs::create_dir_all(&work).unwrap();

    let completion = CompletionClient::new(&CompletionConfig {
        endpoint: completion_endpoint.to_string(),
        timeout_secs: 5,
        ..CompletionConfig::default()
    })
    .unwrap();

    let store = LocalVectorStore::open(&dir.path().join("vectors")).unwrap();

    let sandbox = SandboxRunner::new(
        &SandboxConfig {
            launcher: Vec::new(),
            host_dir: work.clone(),
            sandbox_dir: work.clone(),
            timeout_secs: 10,
        },
        CancellationToken::new(),
    );

    let events = Arc::new(CollectingEventSink::new());

    let state = AppState {
        completion,
        knowledge: KnowledgeBase::new(Arc::new(store)),
        sandbox,
        events: events.clone(),
        api_key: api_key.map(str::to_string),
        pull_timeout: Duration::from_secs(5),
    };

    TestApp {
        state: Arc::new(state),
        events,
        work,
        _dir: dir,
    }
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_with_token(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, json: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_empty(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
