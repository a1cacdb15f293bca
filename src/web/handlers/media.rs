//! Media library HTTP handlers
//!
//! Covers uploads, external URLs, the trash and the lock flag. Stored files
//! are served from `/api/media/{id}/file`.

use axum::{
    Json,
    extract::{Multipart, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::models::{LockMediaRequest, MediaListQuery, MediaUpload, RegisterExternalMediaRequest};
use crate::web::{
    AppState,
    extractors::{ApiQuery, IdPath, RequestContext},
    responses::{bad_request, handle_created, handle_error, handle_result},
    utils::{log_request, sanitize_file_name},
};

pub async fn list_media(
    State(state): State<AppState>,
    context: RequestContext,
    ApiQuery(query): ApiQuery<MediaListQuery>,
) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.media.list_active(&query).await)
}

pub async fn list_trash(
    State(state): State<AppState>,
    context: RequestContext,
    ApiQuery(query): ApiQuery<MediaListQuery>,
) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.media.list_trash(&query).await)
}

pub async fn media_stats(State(state): State<AppState>, context: RequestContext) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.media.stats().await)
}

pub async fn get_media(
    State(state): State<AppState>,
    context: RequestContext,
    IdPath(id): IdPath,
) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.media.get(&id).await)
}

/// Multipart upload with a `file` part and optional `name` and `cat_id` parts
pub async fn upload_media(
    State(state): State<AppState>,
    context: RequestContext,
    mut multipart: Multipart,
) -> Response {
    log_request(&context);

    let mut file: Option<(Option<String>, Bytes)> = None;
    let mut name: Option<String> = None;
    let mut cat_id: Option<Uuid> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return bad_request(&format!("Invalid multipart body: {}", e)).into_response(),
        };

        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().map(sanitize_file_name);
                match field.bytes().await {
                    Ok(data) => file = Some((file_name, data)),
                    Err(e) => {
                        return bad_request(&format!("Failed to read upload: {}", e)).into_response();
                    }
                }
            }
            "name" => name = field.text().await.ok().filter(|n| !n.trim().is_empty()),
            "cat_id" => {
                let Ok(raw) = field.text().await else {
                    return bad_request("Unreadable cat_id field").into_response();
                };
                let raw = raw.trim();
                if !raw.is_empty() {
                    match Uuid::parse_str(raw) {
                        Ok(id) => cat_id = Some(id),
                        Err(_) => {
                            return bad_request(&format!("Invalid cat_id: {}", raw)).into_response();
                        }
                    }
                }
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    let Some((file_name, data)) = file else {
        return bad_request("Missing 'file' part").into_response();
    };

    let upload = MediaUpload {
        name: name.or(file_name).unwrap_or_default(),
        data,
        cat_id,
        uploaded_by: context.actor,
    };
    handle_created(state.media.upload(upload).await)
}

pub async fn register_external_media(
    State(state): State<AppState>,
    context: RequestContext,
    Json(request): Json<RegisterExternalMediaRequest>,
) -> impl IntoResponse {
    log_request(&context);
    handle_created(state.media.register_external(request, context.actor).await)
}

/// Move an item to the trash
pub async fn trash_media(
    State(state): State<AppState>,
    context: RequestContext,
    IdPath(id): IdPath,
) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.media.soft_delete(&id, context.actor).await)
}

pub async fn restore_media(
    State(state): State<AppState>,
    context: RequestContext,
    IdPath(id): IdPath,
) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.media.restore(&id, context.actor).await)
}

pub async fn lock_media(
    State(state): State<AppState>,
    context: RequestContext,
    IdPath(id): IdPath,
    request: Option<Json<LockMediaRequest>>,
) -> impl IntoResponse {
    log_request(&context);
    let reason = request.and_then(|Json(r)| r.reason);
    handle_result(state.media.lock(&id, reason, context.actor).await)
}

pub async fn unlock_media(
    State(state): State<AppState>,
    context: RequestContext,
    IdPath(id): IdPath,
) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.media.unlock(&id, context.actor).await)
}

pub async fn purge_media(
    State(state): State<AppState>,
    context: RequestContext,
    IdPath(id): IdPath,
) -> impl IntoResponse {
    log_request(&context);
    let result = state.media.permanent_delete(&id, context.actor).await;
    handle_result(result.map(|()| json!({ "id": id, "deleted": true })))
}

pub async fn empty_trash(State(state): State<AppState>, context: RequestContext) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.media.empty_trash(context.actor).await)
}

/// Raw bytes of a stored file with its recorded content type
pub async fn serve_media_file(
    State(state): State<AppState>,
    context: RequestContext,
    IdPath(id): IdPath,
) -> Response {
    log_request(&context);

    match state.media.read_file(&id).await {
        Ok((item, data)) => {
            let content_type = item
                .mime_type
                .unwrap_or_else(|| "application/octet-stream".to_string());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
                ],
                data,
            )
                .into_response()
        }
        Err(e) => handle_error(e).into_response(),
    }
}
