//! # Server Configuration
//!
//! This module contains the server setup and configuration for the WP Sync API.

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    middleware::Next,
    response::Response,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::engine::SyncEngine;
use crate::handlers;
use crate::telemetry::{TraceContext, with_trace_context};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub engine: Arc<SyncEngine>,
}

/// Assigns every request a trace ID and makes it available both as a request
/// extension and through task-local storage for error responses.
async fn trace_context_middleware(mut request: Request, next: Next) -> Response {
    let context = TraceContext::generate();
    request.extensions_mut().insert(context.clone());
    with_trace_context(context, next.run(request)).await
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/tasks",
            get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
        )
        .route("/tasks/{name}/run", post(handlers::tasks::run_task))
        .route("/sync/run", post(handlers::sync::run_all))
        .route("/sync/run-batch", post(handlers::sync::run_batch))
        .route("/sync/status", get(handlers::sync::sync_status))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state.config),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(axum::middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Starts the server and runs it until the shutdown token fires
pub async fn run_server(state: AppState, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = state.config.bind_addr()?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::tasks::list_tasks,
        crate::handlers::tasks::create_task,
        crate::handlers::tasks::run_task,
        crate::handlers::sync::run_all,
        crate::handlers::sync::run_batch,
        crate::handlers::sync::sync_status,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::tasks::TaskInfo,
            crate::handlers::tasks::TasksResponse,
            crate::handlers::tasks::CreateTaskRequest,
            crate::handlers::sync::TaskRunResponse,
            crate::handlers::sync::BatchRunResponse,
            crate::handlers::sync::RunBatchRequest,
            crate::handlers::sync::LogInfo,
            crate::handlers::sync::SyncStatusResponse,
        )
    ),
    info(
        title = "WP Sync API",
        description = "API for managing WordPress-to-document-store synchronization",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
