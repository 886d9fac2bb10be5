pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::api::handlers;
use crate::api::middleware::{metrics::latency_middleware, request_id::request_id_middleware};
use crate::config::AppConfig;
use crate::services::converter::Converter;
use crate::services::dispatcher::Dispatcher;
use crate::services::storage::StorageService;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Room for multipart boundaries and the non-file fields
const MULTIPART_OVERHEAD: usize = 64 * 1024;
const JSON_ESCAPE_FACTOR: usize = 6;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::convert::generate_pdf,
        handlers::convert::upload_requirements,
        handlers::health::health_check,
        handlers::invoke::invoke,
    ),
    components(
        schemas(
            handlers::convert::GenerateForm,
            handlers::convert::GenerateResponse,
            handlers::convert::UploadRequirements,
            handlers::health::HealthResponse,
            models::FileType,
            models::InvocationPayload,
            models::InvocationEnvelope,
        )
    ),
    tags(
        (name = "convert", description = "PDF generation endpoints"),
        (name = "worker", description = "Converter invocation endpoint"),
        (name = "system", description = "Health and diagnostics")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub storage: Arc<dyn StorageService>,
    pub config: AppConfig,
}

/// Front tier: upload form handling, health and API docs
pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config.max_file_size + MULTIPART_OVERHEAD;

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/generate", post(handlers::convert::generate_pdf))
        .route("/upload/:file_type", get(handlers::convert::upload_requirements))
        .route("/health", get(handlers::health::health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Largest invocation body a front tier with the same `max_file_size` can
/// produce. Text is bounded by the front tier's body limit and JSON escapes a
/// control character as `\u00XX`, six bytes per input byte. This dominates
/// base64 growth of binary uploads.
pub fn worker_body_limit(max_file_size: usize) -> usize {
    (max_file_size + MULTIPART_OVERHEAD)
        .saturating_mul(JSON_ESCAPE_FACTOR)
        .saturating_add(MULTIPART_OVERHEAD)
}

/// Back tier: the converter's invocation endpoint
pub fn create_worker_app(converter: Arc<Converter>, max_file_size: usize) -> Router {
    let body_limit = worker_body_limit(max_file_size);

    Router::new()
        .route("/invoke", post(handlers::invoke::invoke))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(converter)
}

/// Request ids, latency events and per-request tracing spans
pub fn instrument(router: Router) -> Router {
    router
        .layer(from_fn(latency_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    info!("📥 {} {}", request.method(), request.uri());
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        info!(
                            "📤 Finished in {:?} with status {}",
                            latency,
                            response.status()
                        );
                    },
                ),
        )
        .layer(from_fn(request_id_middleware))
}
