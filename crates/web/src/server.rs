//! Web server implementation

use crate::error::ApiResult;
use crate::sessions::SessionStore;
use crate::static_files::StaticFiles;
use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use dockhand_common::{ContainerRuntime, DashboardConfig, DockerRuntime, FileNavigator, VERSION};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone, Debug)]
pub struct WebServerConfig {
    /// Request body limit applied to uploads
    pub max_upload_bytes: usize,
    /// Sessions untouched for this long are dropped
    pub idle_timeout_secs: u64,
    /// Upper bound on live sessions
    pub max_sessions: usize,
}

impl From<&DashboardConfig> for WebServerConfig {
    fn from(cfg: &DashboardConfig) -> Self {
        Self {
            max_upload_bytes: cfg.files.max_upload_bytes,
            idle_timeout_secs: cfg.sessions.idle_timeout_secs,
            max_sessions: cfg.sessions.max_sessions,
        }
    }
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self::from(&DashboardConfig::default())
    }
}

/// Shared handler state
pub struct AppState {
    pub navigator: FileNavigator,
    pub sessions: SessionStore,
    pub static_files: StaticFiles,
    pub cfg: WebServerConfig,
}

/// Web server state
#[derive(Clone)]
pub struct WebServer {
    state: Arc<AppState>,
}

pub async fn serve(
    addr: SocketAddr,
    runtime: Arc<dyn ContainerRuntime>,
    cfg: WebServerConfig,
) -> anyhow::Result<()> {
    let server = WebServer::new(runtime, cfg);
    server.serve(addr).await
}

/// Connect to the configured Docker daemon and serve until shutdown
pub async fn run(cfg: &DashboardConfig) -> anyhow::Result<()> {
    cfg.validate()?;
    let addr = cfg.socket_addr()?;
    let runtime = DockerRuntime::connect(&cfg.docker, &cfg.files.listing_locale)?;
    serve(addr, Arc::new(runtime), WebServerConfig::from(cfg)).await
}

impl WebServer {
    /// Create a new web server
    pub fn new(runtime: Arc<dyn ContainerRuntime>, cfg: WebServerConfig) -> Self {
        Self {
            state: Arc::new(AppState {
                navigator: FileNavigator::new(runtime),
                sessions: SessionStore::new(cfg.idle_timeout_secs, cfg.max_sessions),
                static_files: StaticFiles::new(),
                cfg,
            }),
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Create router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(index_handler))
            .route("/static/*path", get(static_handler))
            .route("/api/health", get(health_handler))
            .route("/api/runtime", get(runtime_handler))
            .route("/api/containers", get(list_containers_handler))
            .merge(crate::files::routes())
            .fallback(not_found_handler)
            .layer(DefaultBodyLimit::max(self.state.cfg.max_upload_bytes))
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the web server
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        info!("Dashboard starting on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions: usize,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: VERSION.to_string(),
        sessions: state.sessions.len().await,
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RuntimeStatus {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runtime reachability; answers 503 with the reason when the daemon is down
async fn runtime_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.navigator.runtime().ping().await {
        Ok(()) => Json(RuntimeStatus {
            reachable: true,
            error: None,
        })
        .into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(RuntimeStatus {
                reachable: false,
                error: Some(e.to_string()),
            }),
        )
            .into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListContainersQuery {
    #[serde(default)]
    all: bool,
}

async fn list_containers_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListContainersQuery>,
) -> ApiResult<impl IntoResponse> {
    let containers = state.navigator.runtime().list_containers(params.all).await?;
    Ok(Json(containers))
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    state.static_files.serve("index.html")
}

async fn static_handler(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(path): axum::extract::Path<String>,
) -> Response {
    state.static_files.serve(&path)
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({
        "error": "Not found",
        "kind": "not_found",
    })))
}
