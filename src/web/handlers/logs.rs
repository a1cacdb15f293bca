//! Activity log HTTP handlers
//!
//! Archive and delete run as background operations: the POST answers 202
//! with an operation id, which the progress and result endpoints track.

use axum::{Json, extract::State, response::IntoResponse};

use crate::errors::AppError;
use crate::models::{ArchiveLogsRequest, DeleteLogsRequest, LogQuery, NewLogEntry, OperationStarted};
use crate::web::{
    AppState,
    extractors::{ApiQuery, IdPath, RequestContext},
    responses::{accepted, handle_created, handle_error, handle_result},
    utils::log_request,
};

pub async fn list_logs(
    State(state): State<AppState>,
    context: RequestContext,
    ApiQuery(query): ApiQuery<LogQuery>,
) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.activity.list(&query).await)
}

/// Record a client side event
pub async fn create_log(
    State(state): State<AppState>,
    context: RequestContext,
    Json(mut entry): Json<NewLogEntry>,
) -> axum::response::Response {
    log_request(&context);
    if entry.message.trim().is_empty() || entry.action_type.trim().is_empty() {
        return handle_error(AppError::validation("message and action_type are required"))
            .into_response();
    }
    if entry.user_id.is_none() {
        entry.user_id = context.actor;
    }
    handle_created(state.activity.insert(entry).await)
}

pub async fn archive_logs(
    State(state): State<AppState>,
    context: RequestContext,
    request: Option<Json<ArchiveLogsRequest>>,
) -> axum::response::Response {
    log_request(&context);
    let older_than_days = request.and_then(|Json(r)| r.older_than_days);

    match state.logs.start_archive(older_than_days, context.actor).await {
        Ok(operation_id) => accepted(OperationStarted { operation_id }).into_response(),
        Err(e) => handle_error(e).into_response(),
    }
}

pub async fn delete_logs(
    State(state): State<AppState>,
    context: RequestContext,
    Json(request): Json<DeleteLogsRequest>,
) -> axum::response::Response {
    log_request(&context);

    match state
        .logs
        .start_delete(request.older_than_days, request.archived_only, context.actor)
        .await
    {
        Ok(operation_id) => accepted(OperationStarted { operation_id }).into_response(),
        Err(e) => handle_error(e).into_response(),
    }
}

pub async fn operation_progress(
    State(state): State<AppState>,
    context: RequestContext,
    IdPath(id): IdPath,
) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.logs.progress(&id).await)
}

pub async fn operation_result(
    State(state): State<AppState>,
    context: RequestContext,
    IdPath(id): IdPath,
) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.logs.result(&id).await)
}
