mod common;

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

use cattery_admin::config::{CacheMode, TranslationConfig};
use cattery_admin::errors::TranslationError;
use cattery_admin::translation::{
    DeepLProvider, MemoryCacheBackend, TranslationCache, TranslationProvider, TranslationService,
};
use common::CountingProvider;

const API_KEY: &str = "test-key:fx";

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await });
    format!("http://{}", addr)
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("DeepL-Auth-Key {}", API_KEY))
}

/// Echoes `"{target_lang}|{source_lang}|{text}"` for each text
async fn fake_translate(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    if !authorized(&headers) {
        return (StatusCode::FORBIDDEN, "Wrong key").into_response();
    }
    let target = body["target_lang"].as_str().unwrap_or_default();
    let source = body["source_lang"].as_str().unwrap_or("-");
    let translations: Vec<Value> = body["text"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|text| json!({"text": format!("{}|{}|{}", target, source, text.as_str().unwrap_or_default())}))
        .collect();
    Json(json!({ "translations": translations })).into_response()
}

async fn fake_usage(headers: HeaderMap) -> impl IntoResponse {
    if !authorized(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    Json(json!({"character_count": 1234, "character_limit": 500000})).into_response()
}

fn fake_deepl() -> Router {
    Router::new()
        .route("/v2/translate", post(fake_translate))
        .route("/v2/usage", get(fake_usage))
}

fn provider(base_url: &str, key: &str) -> DeepLProvider {
    DeepLProvider::new(base_url, key, Duration::from_secs(5)).unwrap()
}

fn service(provider: Arc<dyn TranslationProvider>, mode: CacheMode) -> TranslationService {
    let config = TranslationConfig {
        cache_mode: mode,
        ..TranslationConfig::default()
    };
    let cache = TranslationCache::from_config(Arc::new(MemoryCacheBackend::new()), &config);
    TranslationService::new(cache, Some(provider))
}

#[tokio::test]
async fn test_deepl_request_format() {
    let base_url = serve(fake_deepl()).await;
    let provider = provider(&format!("{}/", base_url), API_KEY);

    let texts = vec!["Hello".to_string(), "Kitten".to_string()];
    let translated = provider.translate(&texts, "en", "de").await.unwrap();
    assert_eq!(translated, vec!["DE|EN|Hello", "DE|EN|Kitten"]);

    let auto = provider
        .translate(&["Hallo".to_string()], "auto", "en")
        .await
        .unwrap();
    assert_eq!(auto, vec!["EN|-|Hallo"]);
}

#[tokio::test]
async fn test_deepl_usage() {
    let base_url = serve(fake_deepl()).await;
    let usage = provider(&base_url, API_KEY).usage().await.unwrap();
    assert_eq!(usage.character_count, 1234);
    assert_eq!(usage.character_limit, 500_000);
}

#[tokio::test]
async fn test_deepl_rejects_wrong_key() {
    let base_url = serve(fake_deepl()).await;
    let err = provider(&base_url, "other")
        .translate(&["Hello".to_string()], "en", "de")
        .await
        .unwrap_err();
    assert!(matches!(err, TranslationError::AuthenticationFailed { .. }), "{err:?}");
}

#[tokio::test]
async fn test_deepl_status_mapping() {
    let router = Router::new()
        .route("/limited/v2/translate", post(|| async { StatusCode::TOO_MANY_REQUESTS }))
        .route("/quota/v2/translate", post(|| async { StatusCode::from_u16(456).unwrap() }))
        .route(
            "/broken/v2/translate",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
    let base_url = serve(router).await;
    let texts = vec!["Hello".to_string()];

    let limited = provider(&format!("{}/limited", base_url), API_KEY)
        .translate(&texts, "en", "de")
        .await
        .unwrap_err();
    assert!(matches!(limited, TranslationError::RateLimited));

    let quota = provider(&format!("{}/quota", base_url), API_KEY)
        .translate(&texts, "en", "de")
        .await
        .unwrap_err();
    assert!(matches!(quota, TranslationError::QuotaExceeded));

    match provider(&format!("{}/broken", base_url), API_KEY)
        .translate(&texts, "en", "de")
        .await
        .unwrap_err()
    {
        TranslationError::Upstream { status, message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "upstream down");
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrent_identical_requests_call_upstream_once() {
    let counting = Arc::new(CountingProvider::with_delay(Duration::from_millis(100)));
    let service = service(counting.clone(), CacheMode::Individual);

    let results = futures::future::join_all(
        (0..5).map(|_| service.translate("Playful and gentle", "en", "de")),
    )
    .await;

    for result in results {
        assert_eq!(result.unwrap().text, "de:Playful and gentle");
    }
    assert_eq!(counting.calls(), 1);
    assert_eq!(service.stats().in_flight, 0);

    let cached = service.translate("Playful and gentle", "en", "de").await.unwrap();
    assert!(cached.cached);
    assert_eq!(counting.calls(), 1);
}

#[tokio::test]
async fn test_grouped_cache_serves_repeat_lookups() {
    let counting = Arc::new(CountingProvider::default());
    let service = service(counting.clone(), CacheMode::Grouped);

    let first = service
        .translate_batch(&["Luna".to_string(), "Milo".to_string()], "en", "fr")
        .await
        .unwrap();
    assert!(first.iter().all(|t| !t.cached));

    let second = service.translate("Milo", "en", "fr").await.unwrap();
    assert_eq!(second.text, "fr:Milo");
    assert!(second.cached);
    assert_eq!(counting.calls(), 1);

    let usage = service.usage().await.unwrap();
    let pair = usage
        .by_language_pair
        .iter()
        .find(|p| p.source_lang == "en" && p.target_lang == "fr")
        .unwrap();
    assert_eq!(pair.characters, 8);
}

#[tokio::test]
async fn test_service_over_deepl_caches_results() {
    let base_url = serve(fake_deepl()).await;
    let service = service(Arc::new(provider(&base_url, API_KEY)), CacheMode::Both);

    let first = service.translate("Hello", "en", "de").await.unwrap();
    assert_eq!(first.text, "DE|EN|Hello");
    assert!(!first.cached);

    let second = service.translate("Hello", "en", "de").await.unwrap();
    assert_eq!(second.text, "DE|EN|Hello");
    assert!(second.cached);

    let stats = service.stats();
    assert_eq!(stats.upstream_calls, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.cache_backend, "memory");

    assert!(service.clear_cache().await.unwrap() >= 1);
    assert!(!service.translate("Hello", "en", "de").await.unwrap().cached);
}
