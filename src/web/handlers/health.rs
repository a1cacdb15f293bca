//! Health check handler

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::warn;

use crate::web::{
    AppState,
    extractors::RequestContext,
    responses::{ApiResponse, HealthResponse},
    utils::log_request,
};

/// Reports database connectivity and the translation setup.
/// Answers 503 when the database cannot be reached.
pub async fn health_check(State(state): State<AppState>, context: RequestContext) -> impl IntoResponse {
    log_request(&context);

    let (status, database) = match state.database.connection.ping().await {
        Ok(()) => (StatusCode::OK, "connected"),
        Err(e) => {
            warn!("Database health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unreachable")
        }
    };
    let stats = state.translation.stats();

    let body = HealthResponse {
        status: if status.is_success() { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        translation_configured: state.translation.is_configured(),
        cache_backend: stats.cache_backend,
    };

    (status, axum::Json(ApiResponse::success(body)))
}
