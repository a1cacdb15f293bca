//! Cat profile HTTP handlers

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use crate::models::{CatCreateRequest, CatListQuery, CatUpdateRequest};
use crate::web::{
    AppState,
    extractors::{ApiQuery, IdPath, RequestContext},
    responses::{handle_created, handle_result},
    utils::log_request,
};

#[derive(Debug, Default, Deserialize)]
pub struct GetCatQuery {
    #[serde(default)]
    pub include_deleted: bool,
}

pub async fn list_cats(
    State(state): State<AppState>,
    context: RequestContext,
    ApiQuery(query): ApiQuery<CatListQuery>,
) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.cats.list(&query).await)
}

pub async fn get_cat(
    State(state): State<AppState>,
    context: RequestContext,
    IdPath(id): IdPath,
    ApiQuery(query): ApiQuery<GetCatQuery>,
) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.cats.get(&id, query.include_deleted).await)
}

pub async fn create_cat(
    State(state): State<AppState>,
    context: RequestContext,
    Json(request): Json<CatCreateRequest>,
) -> impl IntoResponse {
    log_request(&context);
    handle_created(state.cats.create(request, context.actor).await)
}

pub async fn update_cat(
    State(state): State<AppState>,
    context: RequestContext,
    IdPath(id): IdPath,
    Json(request): Json<CatUpdateRequest>,
) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.cats.update(&id, request, context.actor).await)
}

/// Move a cat to the trash
pub async fn delete_cat(
    State(state): State<AppState>,
    context: RequestContext,
    IdPath(id): IdPath,
) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.cats.soft_delete(&id, context.actor).await)
}

pub async fn restore_cat(
    State(state): State<AppState>,
    context: RequestContext,
    IdPath(id): IdPath,
) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.cats.restore(&id, context.actor).await)
}

pub async fn purge_cat(
    State(state): State<AppState>,
    context: RequestContext,
    IdPath(id): IdPath,
) -> impl IntoResponse {
    log_request(&context);
    let result = state.cats.permanent_delete(&id, context.actor).await;
    handle_result(result.map(|()| json!({ "id": id, "deleted": true })))
}

pub async fn record_cat_view(
    State(state): State<AppState>,
    context: RequestContext,
    IdPath(id): IdPath,
) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.cats.record_view(&id).await.map(|()| json!({ "id": id })))
}

pub async fn list_children(
    State(state): State<AppState>,
    context: RequestContext,
    IdPath(id): IdPath,
) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.cats.children_of(&id).await)
}
