//! Idea-to-Prompt Backend
//!
//! A REST API and WebSocket server that turns a raw product idea into a
//! detailed specification document through five chained LLM stages.

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use idea2prompt_backend::{api, config::Config, state::AppState, websocket};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Serialize)]
struct HelloResponse {
    message: String,
    status: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    message: String,
}

/// Request ID middleware - adds unique ID to each request for tracing
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}

fn build_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(hello_world))
        .route("/api/health", get(health_check))
        // Workflow API
        .route("/api/workflow", get(api::workflow::get_workflow))
        .route("/api/workflow/run", post(api::workflow::run_workflow))
        .route("/api/workflow/reset", post(api::workflow::reset_workflow))
        .route("/api/workflow/document", get(api::workflow::get_document))
        .route("/api/config", get(api::config::get_config))
        // WebSocket for real-time updates
        .route("/ws", get(websocket::websocket_handler))
        // Middleware (order matters - request_id should be first)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    info!("Configuration loaded: {:?}", config);
    if config.llm.api_key.is_empty() {
        warn!("LLM_API_KEY is not set; every stage call will be rejected upstream");
    }

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    let app_state = Arc::new(AppState::new(config));
    let app = build_router(app_state);

    info!("🚀 Server running on http://{}", addr);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

async fn hello_world() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello from Idea-to-Prompt Backend!".to_string(),
        status: "ok".to_string(),
    })
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "Backend is healthy".to_string(),
    })
}
