//! Upstream translation providers

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::errors::{TranslationError, TranslationResult};

/// Source language meaning "let the provider detect it"
pub const AUTO_DETECT: &str = "auto";

/// Character quota reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUsage {
    pub character_count: u64,
    pub character_limit: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Translate `texts` in one request, preserving order
    async fn translate(
        &self,
        texts: &[String],
        source: &str,
        target: &str,
    ) -> TranslationResult<Vec<String>>;

    async fn usage(&self) -> TranslationResult<ProviderUsage>;
}

#[derive(Serialize)]
struct DeepLTranslateRequest<'a> {
    text: &'a [String],
    target_lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_lang: Option<String>,
}

#[derive(Deserialize)]
struct DeepLTranslateResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Deserialize)]
struct DeepLTranslation {
    text: String,
}

/// DeepL compatible HTTP API
pub struct DeepLProvider {
    client: Client,
    api_url: String,
    api_key: String,
}

impl DeepLProvider {
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> TranslationResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TranslationError::from)?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn auth_header(&self) -> String {
        format!("DeepL-Auth-Key {}", self.api_key)
    }

    async fn error_for(response: reqwest::Response) -> TranslationError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .ok()
            .filter(|body| !body.trim().is_empty())
            .unwrap_or_else(|| format!("HTTP {}", status));
        TranslationError::from_status(status, message)
    }
}

#[async_trait]
impl TranslationProvider for DeepLProvider {
    async fn translate(
        &self,
        texts: &[String],
        source: &str,
        target: &str,
    ) -> TranslationResult<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = DeepLTranslateRequest {
            text: texts,
            target_lang: target.to_uppercase(),
            source_lang: (!source.eq_ignore_ascii_case(AUTO_DETECT)).then(|| source.to_uppercase()),
        };

        debug!(count = texts.len(), source, target, "Calling translation provider");
        let response = self
            .client
            .post(format!("{}/v2/translate", self.api_url))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body: DeepLTranslateResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::InvalidResponse(e.to_string()))?;

        if body.translations.len() != texts.len() {
            return Err(TranslationError::InvalidResponse(format!(
                "Expected {} translations, got {}",
                texts.len(),
                body.translations.len()
            )));
        }

        Ok(body.translations.into_iter().map(|t| t.text).collect())
    }

    async fn usage(&self) -> TranslationResult<ProviderUsage> {
        let response = self
            .client
            .get(format!("{}/v2/usage", self.api_url))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| TranslationError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_auto_source() {
        let texts = vec!["hello".to_string()];
        let request = DeepLTranslateRequest {
            text: &texts,
            target_lang: "DE".to_string(),
            source_lang: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["target_lang"], "DE");
        assert!(json.get("source_lang").is_none());
    }
}
