//! Typed client for the admin HTTP API
//!
//! GET requests go through the response cache and the request deduplicator,
//! so repeated or concurrent reads of the same path cost one round trip.
//! Mutations invalidate the cached paths they affect.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::client::poller::ArchiveStatusSource;
use crate::client::response_cache::ResponseCache;
use crate::config::ClientConfig;
use crate::database::repositories::traits::MAX_PAGE_SIZE;
use crate::errors::{ClientError, ClientResult};
use crate::models::{
    CatCreateRequest, CatProfile, CatUpdateRequest, LockMediaRequest, MediaItem, OperationStarted,
    PaginatedResponse, TranslateRequest, TranslateResponse,
};
use crate::services::{OperationProgress, OperationResult};
use crate::utils::RequestDeduplicator;
use crate::web::extractors::ACTOR_HEADER;

const CATS_PATH: &str = "/api/cats";
const MEDIA_PATH: &str = "/api/media";

#[derive(Clone)]
pub struct AdminClient {
    http: Client,
    base_url: Url,
    cache: ResponseCache,
    dedup: RequestDeduplicator<ClientResult<Value>>,
    url_check_timeout: Duration,
}

impl AdminClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ClientError::Request(format!("Invalid base URL '{}': {}", config.base_url, e)))?;
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ClientError::from)?;

        Ok(Self {
            http,
            base_url,
            cache: ResponseCache::new(config.response_cache_capacity, config.response_cache_ttl),
            dedup: RequestDeduplicator::new(),
            url_check_timeout: config.url_check_timeout,
        })
    }

    /// Every non-deleted cat, following pages until the last one. Never
    /// fails: an unreachable server or an unrecognised response shape
    /// yields an empty list.
    pub async fn fetch_all_cats(&self) -> Vec<CatProfile> {
        let mut cats = Vec::new();
        let mut page = 1u32;

        loop {
            let path = format!("{}?page={}&limit={}", CATS_PATH, page, MAX_PAGE_SIZE);
            let data = match self.get_data(&path).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(page, "Failed to fetch cats: {}", e);
                    return Vec::new();
                }
            };

            let has_next = data.get("has_next").and_then(Value::as_bool);
            let Some(items) = list_items(data) else {
                warn!(page, "Unrecognised cat list response shape");
                return Vec::new();
            };
            let full_page = items.len() >= MAX_PAGE_SIZE as usize;

            cats.extend(items.into_iter().filter_map(|item| {
                match serde_json::from_value::<CatProfile>(item) {
                    Ok(cat) => Some(cat),
                    Err(e) => {
                        debug!("Skipping unreadable cat entry: {}", e);
                        None
                    }
                }
            }));

            // bare arrays carry no paging information
            if !full_page || has_next != Some(true) {
                return cats;
            }
            page += 1;
        }
    }

    pub async fn get_cat(&self, id: &Uuid) -> ClientResult<CatProfile> {
        decode(self.get_data(&format!("{}/{}", CATS_PATH, id)).await?)
    }

    pub async fn create_cat(&self, request: &CatCreateRequest) -> ClientResult<CatProfile> {
        let data = self.send(Method::POST, CATS_PATH, Some(request)).await?;
        self.invalidate(CATS_PATH);
        decode(data)
    }

    pub async fn update_cat(
        &self,
        id: &Uuid,
        request: &CatUpdateRequest,
    ) -> ClientResult<CatProfile> {
        let data = self
            .send(Method::PATCH, &format!("{}/{}", CATS_PATH, id), Some(request))
            .await?;
        self.invalidate(CATS_PATH);
        decode(data)
    }

    /// Move a cat to the trash
    pub async fn delete_cat(&self, id: &Uuid) -> ClientResult<CatProfile> {
        let data = self
            .send::<()>(Method::DELETE, &format!("{}/{}", CATS_PATH, id), None)
            .await?;
        self.invalidate(CATS_PATH);
        decode(data)
    }

    pub async fn list_media(&self, trash: bool) -> ClientResult<PaginatedResponse<MediaItem>> {
        let path = if trash {
            format!("{}/trash", MEDIA_PATH)
        } else {
            MEDIA_PATH.to_string()
        };
        decode(self.get_data(&path).await?)
    }

    pub async fn trash_media(&self, id: &Uuid, actor: Option<String>) -> ClientResult<MediaItem> {
        let data = self
            .send_as::<()>(
                Method::DELETE,
                &format!("{}/{}", MEDIA_PATH, id),
                None,
                actor.as_deref(),
            )
            .await?;
        self.invalidate_media();
        decode(data)
    }

    pub async fn restore_media(&self, id: &Uuid) -> ClientResult<MediaItem> {
        let data = self
            .send::<()>(Method::POST, &format!("{}/{}/restore", MEDIA_PATH, id), None)
            .await?;
        self.invalidate_media();
        decode(data)
    }

    pub async fn lock_media(&self, id: &Uuid, reason: Option<String>) -> ClientResult<MediaItem> {
        let data = self
            .send(
                Method::POST,
                &format!("{}/{}/lock", MEDIA_PATH, id),
                Some(&LockMediaRequest { reason }),
            )
            .await?;
        self.invalidate_media();
        decode(data)
    }

    pub async fn delete_media_permanently(&self, id: &Uuid) -> ClientResult<()> {
        self.send::<()>(Method::DELETE, &format!("{}/{}/permanent", MEDIA_PATH, id), None)
            .await?;
        self.invalidate_media();
        self.invalidate(CATS_PATH);
        Ok(())
    }

    pub async fn start_log_archive(&self, older_than_days: Option<u32>) -> ClientResult<Uuid> {
        let data = self
            .send(
                Method::POST,
                "/api/logs/archive",
                Some(&json!({ "older_than_days": older_than_days })),
            )
            .await?;
        let started: OperationStarted = decode(data)?;
        Ok(started.operation_id)
    }

    pub async fn translate(&self, request: &TranslateRequest) -> ClientResult<TranslateResponse> {
        decode(self.send(Method::POST, "/api/translate", Some(request)).await?)
    }

    /// Whether `url` answers a HEAD request successfully within the check timeout
    pub async fn validate_media_url(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }

        match self
            .http
            .head(parsed)
            .timeout(self.url_check_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Media URL check failed for {}: {}", url, e);
                false
            }
        }
    }

    /// Forget cached responses and in-flight reads, e.g. after navigation
    pub fn reset(&self) {
        self.dedup.clear();
        self.cache.clear();
    }

    fn invalidate_media(&self) {
        self.invalidate(MEDIA_PATH);
    }

    /// Drop cached and in-flight reads under `prefix` after a mutation
    fn invalidate(&self, prefix: &str) {
        self.cache.invalidate_prefix(prefix);
        self.dedup.forget_prefix(prefix);
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Request(format!("Invalid path '{}': {}", path, e)))
    }

    /// Cached, deduplicated GET returning the envelope payload
    async fn get_data(&self, path: &str) -> ClientResult<Value> {
        let generation = self.cache.generation();
        if let Some(cached) = self.cache.get(path) {
            return Ok(cached);
        }

        let url = self.url(path)?;
        let http = self.http.clone();
        let data = self
            .dedup
            .execute(path, move || async move {
                let response = http.get(url).send().await?;
                read_envelope(response).await
            })
            .await?;

        self.cache.insert_if_current(path, data.clone(), generation);
        Ok(data)
    }

    /// Uncached GET, used for polling
    async fn get_fresh(&self, path: &str) -> ClientResult<Value> {
        let response = self.http.get(self.url(path)?).send().await?;
        read_envelope(response).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ClientResult<Value> {
        self.send_as(method, path, body, None).await
    }

    async fn send_as<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        actor: Option<&str>,
    ) -> ClientResult<Value> {
        let mut request = self.http.request(method, self.url(path)?);
        if let Some(actor) = actor {
            request = request.header(ACTOR_HEADER, actor);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        read_envelope(request.send().await?).await
    }
}

#[async_trait]
impl ArchiveStatusSource for AdminClient {
    async fn progress(&self, operation_id: &Uuid) -> ClientResult<OperationProgress> {
        decode(
            self.get_fresh(&format!("/api/logs/operations/{}/progress", operation_id))
                .await?,
        )
    }

    async fn result(&self, operation_id: &Uuid) -> ClientResult<OperationResult> {
        decode(
            self.get_fresh(&format!("/api/logs/operations/{}/result", operation_id))
                .await?,
        )
    }
}

/// Payload of an `{success, data, error}` envelope, or the whole body when
/// it is not wrapped
async fn read_envelope(response: reqwest::Response) -> ClientResult<Value> {
    let status = response.status();
    let body: Value = match response.json().await {
        Ok(body) => body,
        Err(e) if status.is_success() => {
            return Err(ClientError::UnexpectedResponse(e.to_string()));
        }
        Err(_) => Value::Null,
    };

    if !status.is_success() {
        return Err(ClientError::Http {
            status: status.as_u16(),
            message: error_message(&body, status),
        });
    }

    match body {
        Value::Object(mut map) if map.contains_key("data") || map.contains_key("success") => {
            if map.get("success").and_then(Value::as_bool) == Some(false) {
                return Err(ClientError::Http {
                    status: status.as_u16(),
                    message: error_message(&Value::Object(map), status),
                });
            }
            Ok(map.remove("data").unwrap_or(Value::Null))
        }
        other => Ok(other),
    }
}

fn error_message(body: &Value, status: StatusCode) -> String {
    body.get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}

/// List items from either a bare array or a paginated `{items: [...]}` object
fn list_items(data: Value) -> Option<Vec<Value>> {
    match data {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

fn decode<T: DeserializeOwned>(data: Value) -> ClientResult<T> {
    serde_json::from_value(data).map_err(|e| ClientError::UnexpectedResponse(e.to_string()))
}
