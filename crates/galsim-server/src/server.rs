//! HTTP Server - 提供对话会话的 REST API

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use galsim_core::{DialogueRequest, StartRequest};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::DialogueService;

/// 应用状态 - 所有 handler 共享同一个会话存储
#[derive(Clone)]
pub struct AppState {
    pub service: DialogueService,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(service: DialogueService, config: ServerConfig) -> Self {
        Self { service, config }
    }
}

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 是否允许跨域
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors: true,
        }
    }
}

impl From<&galsim_config::ServerConfig> for ServerConfig {
    fn from(config: &galsim_config::ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            cors: config.cors,
        }
    }
}

/// 运行 HTTP 服务器
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.host, state.config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve(listener, state).await
}

/// 在已绑定的 listener 上提供服务
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = create_router(state);

    tracing::info!("GalSim server starting on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// 创建路由
pub fn create_router(state: AppState) -> Router {
    let cors = state.config.cors;
    let state = Arc::new(state);

    let router = Router::new()
        // 健康检查
        .route("/health", get(health_handler))
        // 对话
        .route("/api/v1/start", post(start_handler))
        .route("/api/v1/dialogue", post(dialogue_handler))
        // 会话信息
        .route("/api/v1/session/:session_id", get(session_info_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// 健康检查处理器
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "sessions": state.service.store().len(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// 开始对话处理器
async fn start_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartRequest>,
) -> impl IntoResponse {
    tracing::debug!("Start request: {:?}", req);

    match state.service.start(req).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// 继续对话处理器
async fn dialogue_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DialogueRequest>,
) -> impl IntoResponse {
    tracing::debug!(
        "Dialogue request - session: {}, input: {}",
        req.session_id,
        req.user_input
    );

    match state.service.advance(req).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// 会话信息处理器
async fn session_info_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.service.info(&session_id) {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => e.into_response(),
    }
}
