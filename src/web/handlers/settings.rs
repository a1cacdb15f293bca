//! Site settings HTTP handlers

use axum::{Json, extract::State, response::IntoResponse};

use crate::models::SeoSettings;
use crate::web::{AppState, extractors::RequestContext, responses::handle_result, utils::log_request};

pub async fn get_seo_settings(State(state): State<AppState>, context: RequestContext) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.settings.get_seo().await)
}

pub async fn update_seo_settings(
    State(state): State<AppState>,
    context: RequestContext,
    Json(settings): Json<SeoSettings>,
) -> impl IntoResponse {
    log_request(&context);
    handle_result(state.settings.update_seo(settings, context.actor).await)
}
