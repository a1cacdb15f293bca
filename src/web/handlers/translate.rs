//! Translation HTTP handlers
//!
//! Translation failures never fail the request: the original text comes
//! back with `translated: false` and the error message.

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use tracing::warn;

use crate::errors::AppError;
use crate::models::{BatchTranslateRequest, TranslateRequest, TranslateResponse};
use crate::web::{
    AppState,
    extractors::RequestContext,
    responses::{handle_error, handle_result, ok},
    utils::log_request,
};

fn check_target(target_lang: &str) -> Result<(), AppError> {
    if target_lang.trim().is_empty() {
        return Err(AppError::validation("target_lang is required"));
    }
    Ok(())
}

pub async fn translate(
    State(state): State<AppState>,
    context: RequestContext,
    Json(request): Json<TranslateRequest>,
) -> axum::response::Response {
    log_request(&context);
    if let Err(e) = check_target(&request.target_lang) {
        return handle_error(e).into_response();
    }

    let response = match state
        .translation
        .translate(&request.text, &request.source_lang, &request.target_lang)
        .await
    {
        Ok(translation) => TranslateResponse {
            translated: true,
            text: translation.text,
            cached: translation.cached,
            error: None,
        },
        Err(e) => {
            warn!(target_lang = %request.target_lang, "Returning untranslated text: {}", e);
            TranslateResponse::untranslated(request.text, Some(e.to_string()))
        }
    };
    ok(response).into_response()
}

pub async fn translate_batch(
    State(state): State<AppState>,
    context: RequestContext,
    Json(request): Json<BatchTranslateRequest>,
) -> axum::response::Response {
    log_request(&context);
    if let Err(e) = check_target(&request.target_lang) {
        return handle_error(e).into_response();
    }

    let responses: Vec<TranslateResponse> = match state
        .translation
        .translate_batch(&request.texts, &request.source_lang, &request.target_lang)
        .await
    {
        Ok(translations) => translations
            .into_iter()
            .map(|translation| TranslateResponse {
                translated: true,
                text: translation.text,
                cached: translation.cached,
                error: None,
            })
            .collect(),
        Err(e) => {
            warn!(count = request.texts.len(), "Returning untranslated batch: {}", e);
            let error = e.to_string();
            request
                .texts
                .into_iter()
                .map(|text| TranslateResponse::untranslated(text, Some(error.clone())))
                .collect()
        }
    };
    ok(responses).into_response()
}

pub async fn translation_stats(State(state): State<AppState>, context: RequestContext) -> impl IntoResponse {
    log_request(&context);
    ok(state.translation.stats())
}

pub async fn clear_translation_cache(
    State(state): State<AppState>,
    context: RequestContext,
) -> impl IntoResponse {
    log_request(&context);
    let result = state.translation.clear_cache().await.map_err(AppError::from);
    handle_result(result.map(|removed| json!({ "removed": removed })))
}

pub async fn translation_usage(State(state): State<AppState>, context: RequestContext) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.translation.usage().await.map_err(AppError::from))
}
