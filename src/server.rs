// src/server.rs

use crate::{
    auth::api_key_auth,
    completion::CompletionClient,
    config::Config,
    error::AppError,
    events::{EndpointEvent, EventSink},
    knowledge::{KnowledgeBase, LocalVectorStore, SearchHit},
    postprocess::postprocess_code,
    prompt::build_prompt,
    sandbox::{ExecutionRequest, ExecutionResult, SandboxRunner},
    sinks::LogEventSink,
    util::elapsed_ms,
};

use anyhow::Context;
use axum::{
    body::Body,
    extract::{FromRequest, FromRequestParts, State},
    http::Request,
    middleware,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::Span;

const DEFAULT_LANGUAGE: &str = "python";
const DEFAULT_SEARCH_K: usize = 5;
const MAX_SEARCH_K: usize = 20;
const PULL_TIMEOUT: Duration = Duration::from_secs(600);

/* ---------------- state ---------------- */

/// Everything a handler needs, built once at start-up.
pub struct AppState {
    pub completion: CompletionClient,
    pub knowledge: KnowledgeBase,
    pub sandbox: SandboxRunner,
    pub events: Arc<dyn EventSink>,
    pub api_key: Option<String>,
    pub pull_timeout: Duration,
}

impl AppState {
    pub fn from_config(cfg: &Config, shutdown: CancellationToken) -> anyhow::Result<Self> {
        let completion = CompletionClient::new(&cfg.completion)?;

        let store = LocalVectorStore::open(&cfg.knowledge.path)
            .with_context(|| format!("Failed to open vector store at {:?}", cfg.knowledge.path))?;

        Ok(Self {
            completion,
            knowledge: KnowledgeBase::new(Arc::new(store)),
            sandbox: SandboxRunner::new(&cfg.sandbox, shutdown),
            events: Arc::new(LogEventSink),
            api_key: cfg.server.api_key.clone(),
            pull_timeout: PULL_TIMEOUT,
        })
    }
}

/* ---------------- server ---------------- */

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/v1/infer", post(infer))
        .route("/v1/search", get(search))
        .route("/v1/run-tests", post(run_tests))
        .route("/v1/update-model", post(update_model))
        .route_layer(middleware::from_fn_with_state(state.clone(), api_key_auth));

    Router::new()
        .route("/healthz", get(health))
        .merge(protected)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<Body>| {
                    tracing::info_span!(
                        "http_request",
                        method = %req.method(),
                        path = %req.uri().path(),
                    )
                })
                .on_response(|res: &Response, latency: Duration, _span: &Span| {
                    tracing::info!(
                        status = res.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "request completed"
                    );
                }),
        )
        .with_state(state)
}

pub async fn serve(cfg: Config) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState::from_config(&cfg, shutdown.clone())?);
    let app = router(state);

    let socket: SocketAddr = cfg
        .server
        .addr
        .parse()
        .with_context(|| format!("Invalid listen address {:?}", cfg.server.addr))?;
    let listener = TcpListener::bind(socket).await?;

    tracing::info!("codegate listening on http://{}", socket);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;
    Ok(())
}

/// Resolve on Ctrl-C and cancel in-flight sandbox runs.
async fn shutdown_signal(token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
    token.cancel();
}

/* ---------------- extractors ---------------- */

/// JSON body whose rejections are reported as `{"detail": ...}` with 422.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejections are reported as `{"detail": ...}` with 422.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/* ---------------- request models ---------------- */

#[derive(Debug, Serialize, Deserialize)]
pub struct InferRequest {
    pub prompt: String,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InferResponse {
    pub code: String,
    pub explanation: Option<String>,
    pub latency_ms: u64,
    pub warning: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateModelRequest {
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateModelResponse {
    pub message: String,
    pub model: String,
    pub version: Option<String>,
}

/* ---------------- endpoints ---------------- */

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn to_value<T: Serialize>(v: &T) -> serde_json::Value {
    serde_json::to_value(v).unwrap_or(serde_json::Value::Null)
}

/// Emit the error event and hand the error back for the response.
fn fail(state: &AppState, endpoint: &'static str, err: impl Into<AppError>) -> AppError {
    let err = err.into();
    state.events.emit(EndpointEvent::error(endpoint, err.to_string()));
    err
}

async fn infer(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<InferRequest>,
) -> Result<Json<InferResponse>, AppError> {
    const ENDPOINT: &str = "infer";
    let start = Instant::now();
    state.events.emit(EndpointEvent::request(ENDPOINT, to_value(&req)));

    let prompt = build_prompt(&req.prompt, req.file_path.as_deref(), req.language.as_deref());

    let raw = state
        .completion
        .generate(&prompt)
        .await
        .map_err(|e| fail(&state, ENDPOINT, e))?;

    let language = req.language.as_deref().unwrap_or(DEFAULT_LANGUAGE);
    let (code, warning) = postprocess_code(&raw, language, false);

    let latency_ms = elapsed_ms(start);
    let resp = InferResponse {
        code,
        explanation: None,
        latency_ms,
        warning,
    };

    state
        .events
        .emit(EndpointEvent::response(ENDPOINT, to_value(&resp), latency_ms));
    Ok(Json(resp))
}

async fn search(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    const ENDPOINT: &str = "search";
    let start = Instant::now();
    state.events.emit(EndpointEvent::request(ENDPOINT, to_value(&params)));

    let k = params.k.unwrap_or(DEFAULT_SEARCH_K);
    if !(1..=MAX_SEARCH_K).contains(&k) {
        return Err(fail(
            &state,
            ENDPOINT,
            AppError::Validation(format!("k must be between 1 and {}", MAX_SEARCH_K)),
        ));
    }

    let results = state
        .knowledge
        .search_kb(&params.q, k)
        .await
        .map_err(|e| fail(&state, ENDPOINT, e))?;

    let resp = SearchResponse { results };
    let latency_ms = elapsed_ms(start);
    state
        .events
        .emit(EndpointEvent::response(ENDPOINT, to_value(&resp), latency_ms));
    Ok(Json(resp))
}

async fn run_tests(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ExecutionRequest>,
) -> Result<Json<ExecutionResult>, AppError> {
    const ENDPOINT: &str = "run-tests";
    let start = Instant::now();
    state.events.emit(EndpointEvent::request(
        ENDPOINT,
        serde_json::json!({ "code": req.code, "language": req.language }),
    ));

    let result = state
        .sandbox
        .run(&req)
        .await
        .map_err(|e| fail(&state, ENDPOINT, e))?;

    let latency_ms = elapsed_ms(start);
    state
        .events
        .emit(EndpointEvent::response(ENDPOINT, to_value(&result), latency_ms));
    Ok(Json(result))
}

async fn update_model(
    State(state): State<Arc<AppState>>,
    body: Option<Json<UpdateModelRequest>>,
) -> Result<Json<UpdateModelResponse>, AppError> {
    const ENDPOINT: &str = "update-model";
    let start = Instant::now();

    let model = body
        .and_then(|Json(b)| b.model)
        .unwrap_or_else(|| state.completion.defaults().model.clone());
    state
        .events
        .emit(EndpointEvent::request(ENDPOINT, serde_json::json!({ "model": model })));

    state
        .completion
        .pull_model(&model, state.pull_timeout)
        .await
        .map_err(|e| fail(&state, ENDPOINT, AppError::ModelPull(e.to_string())))?;

    let resp = UpdateModelResponse {
        message: "Model updated".to_string(),
        model,
        version: None,
    };

    let latency_ms = elapsed_ms(start);
    state
        .events
        .emit(EndpointEvent::response(ENDPOINT, to_value(&resp), latency_ms));
    Ok(Json(resp))
}
