//! Request extractors
//!
//! Extractors here reject with the standard JSON envelope instead of axum's
//! plain-text rejections.

use axum::{
    Json,
    extract::{FromRequestParts, Path, Query},
    http::{Method, StatusCode, Uri, request::Parts},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::responses::ApiResponse;

/// Header carrying the name of the admin performing a mutation
pub const ACTOR_HEADER: &str = "x-admin-user";

/// Header a proxy may set to correlate requests
pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn reject(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error(message)),
    )
        .into_response()
}

/// Query string parsed into `T`
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| reject(format!("Invalid query parameters: {}", e.body_text())))?;
        Ok(Self(params))
    }
}

/// UUID path parameter (`/{id}`)
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub Uuid);

impl IdPath {
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| reject(format!("Invalid path: {}", e.body_text())))?;
        let id = super::utils::extract_uuid_param(&raw).map_err(reject)?;
        Ok(Self(id))
    }
}

/// Request context information
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub user_agent: Option<String>,
    pub real_ip: Option<String>,
    pub request_id: String,
    /// Admin performing the request, from [`ACTOR_HEADER`]
    pub actor: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            method: Method::GET,
            uri: Uri::default(),
            user_agent: None,
            real_ip: None,
            request_id: Uuid::new_v4().to_string(),
            actor: None,
            timestamp: chrono::Utc::now(),
        }
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };

        let real_ip = header("x-real-ip")
            .or_else(|| header("x-forwarded-for"))
            .map(|s| s.split(',').next().unwrap_or(&s).trim().to_string());

        Ok(Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            user_agent: header("user-agent"),
            real_ip,
            request_id: header(REQUEST_ID_HEADER).unwrap_or_else(|| Uuid::new_v4().to_string()),
            actor: header(ACTOR_HEADER),
            timestamp: chrono::Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_request_context_reads_headers() {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/api/media/1")
            .header(ACTOR_HEADER, " alice ")
            .header("x-forwarded-for", "10.0.0.1, 10.0.0.2")
            .header(REQUEST_ID_HEADER, "req-42")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let context = RequestContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(context.method, Method::DELETE);
        assert_eq!(context.actor.as_deref(), Some("alice"));
        assert_eq!(context.real_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(context.request_id, "req-42");
    }

    #[tokio::test]
    async fn test_blank_actor_is_ignored() {
        let request = Request::builder()
            .uri("/api/cats")
            .header(ACTOR_HEADER, "   ")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let context = RequestContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(context.actor.is_none());
        assert!(!context.request_id.is_empty());
    }
}
