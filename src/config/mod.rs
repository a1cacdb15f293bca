use anyhow::Result;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use strum::{Display, EnumString};
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

/// Environment variable prefix for configuration overrides
/// (`CATTERY_WEB__PORT=9000` sets `web.port`)
pub const ENV_PREFIX: &str = "CATTERY_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL used when building media URLs
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_media_path")]
    pub media_path: PathBuf,
}

/// Which backend holds cached translations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CacheBackendKind {
    Redis,
    Memory,
}

/// Which storage policies a translation is written under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CacheMode {
    /// One key per (text, source, target)
    Individual,
    /// One blob per language pair
    Grouped,
    /// Written under both policies
    Both,
}

impl CacheMode {
    pub fn writes_individual(&self) -> bool {
        matches!(self, CacheMode::Individual | CacheMode::Both)
    }

    pub fn writes_grouped(&self) -> bool {
        matches!(self, CacheMode::Grouped | CacheMode::Both)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Base URL of the DeepL-compatible API
    #[serde(default = "default_translation_api_url")]
    pub api_url: String,
    /// API key; translation degrades to returning the original text without it
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_cache_backend")]
    pub cache_backend: CacheBackendKind,
    #[serde(default = "default_cache_mode")]
    pub cache_mode: CacheMode,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(with = "duration_serde::duration", default = "default_individual_ttl")]
    pub individual_ttl: Duration,
    #[serde(with = "duration_serde::duration", default = "default_grouped_ttl")]
    pub grouped_ttl: Duration,
    #[serde(with = "duration_serde::duration", default = "default_translation_timeout")]
    pub request_timeout: Duration,
    /// Record characters translated per language pair
    #[serde(default = "default_true")]
    pub record_usage: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    /// Default age in days used by archive requests that do not specify one
    #[serde(default = "default_archive_after_days")]
    pub archive_after_days: u32,
    /// How long archived logs are kept before the housekeeper purges them
    #[serde(with = "duration_serde::duration", default = "default_archive_retention")]
    pub archive_retention: Duration,
    #[serde(with = "duration_serde::duration", default = "default_housekeeper_interval")]
    pub housekeeper_interval: Duration,
    /// How long finished operation records stay queryable
    #[serde(with = "duration_serde::duration", default = "default_operation_ttl")]
    pub operation_ttl: Duration,
    #[serde(default = "default_archive_batch_size")]
    pub batch_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(with = "duration_serde::duration", default = "default_response_cache_ttl")]
    pub response_cache_ttl: Duration,
    #[serde(default = "default_response_cache_capacity")]
    pub response_cache_capacity: usize,
    #[serde(with = "duration_serde::duration", default = "default_poll_interval")]
    pub poll_interval: Duration,
    #[serde(default = "default_max_poll_failures")]
    pub max_poll_failures: u32,
    /// Consecutive poll failures after which the final-result endpoint is tried
    #[serde(default = "default_final_result_after_failures")]
    pub final_result_after_failures: u32,
    #[serde(with = "duration_serde::duration", default = "default_client_timeout")]
    pub request_timeout: Duration,
    #[serde(with = "duration_serde::duration", default = "default_url_check_timeout")]
    pub url_check_timeout: Duration,
}

fn parse_default_duration(value: &str) -> Duration {
    humantime::parse_duration(value).unwrap_or_default()
}

fn default_true() -> bool {
    true
}

// Web defaults
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

// Storage defaults
fn default_media_path() -> PathBuf {
    PathBuf::from(DEFAULT_MEDIA_PATH)
}

// Translation defaults
fn default_translation_api_url() -> String {
    DEFAULT_TRANSLATION_API_URL.to_string()
}

fn default_cache_backend() -> CacheBackendKind {
    CacheBackendKind::Redis
}

fn default_cache_mode() -> CacheMode {
    CacheMode::Both
}

fn default_key_prefix() -> String {
    DEFAULT_TRANSLATION_KEY_PREFIX.to_string()
}

fn default_individual_ttl() -> Duration {
    parse_default_duration(DEFAULT_INDIVIDUAL_TTL)
}

fn default_grouped_ttl() -> Duration {
    parse_default_duration(DEFAULT_GROUPED_TTL)
}

fn default_translation_timeout() -> Duration {
    parse_default_duration(DEFAULT_TRANSLATION_TIMEOUT)
}

fn default_redis_url() -> String {
    DEFAULT_REDIS_URL.to_string()
}

// Log defaults
fn default_archive_after_days() -> u32 {
    DEFAULT_ARCHIVE_AFTER_DAYS
}

fn default_archive_retention() -> Duration {
    parse_default_duration(DEFAULT_ARCHIVE_RETENTION)
}

fn default_housekeeper_interval() -> Duration {
    parse_default_duration(DEFAULT_HOUSEKEEPER_INTERVAL)
}

fn default_operation_ttl() -> Duration {
    parse_default_duration(DEFAULT_OPERATION_TTL)
}

fn default_archive_batch_size() -> u64 {
    DEFAULT_ARCHIVE_BATCH_SIZE
}

// Client defaults
fn default_response_cache_ttl() -> Duration {
    parse_default_duration(DEFAULT_RESPONSE_CACHE_TTL)
}

fn default_response_cache_capacity() -> usize {
    DEFAULT_RESPONSE_CACHE_CAPACITY
}

fn default_poll_interval() -> Duration {
    parse_default_duration(DEFAULT_POLL_INTERVAL)
}

fn default_max_poll_failures() -> u32 {
    DEFAULT_MAX_POLL_FAILURES
}

fn default_final_result_after_failures() -> u32 {
    DEFAULT_FINAL_RESULT_AFTER_FAILURES
}

fn default_client_timeout() -> Duration {
    parse_default_duration(DEFAULT_CLIENT_TIMEOUT)
}

fn default_url_check_timeout() -> Duration {
    parse_default_duration(DEFAULT_URL_CHECK_TIMEOUT)
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: default_translation_api_url(),
            api_key: None,
            cache_backend: default_cache_backend(),
            cache_mode: default_cache_mode(),
            key_prefix: default_key_prefix(),
            individual_ttl: default_individual_ttl(),
            grouped_ttl: default_grouped_ttl(),
            request_timeout: default_translation_timeout(),
            record_usage: true,
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            archive_after_days: default_archive_after_days(),
            archive_retention: default_archive_retention(),
            housekeeper_interval: default_housekeeper_interval(),
            operation_ttl: default_operation_ttl(),
            batch_size: default_archive_batch_size(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            response_cache_ttl: default_response_cache_ttl(),
            response_cache_capacity: default_response_cache_capacity(),
            poll_interval: default_poll_interval(),
            max_poll_failures: default_max_poll_failures(),
            final_result_after_failures: default_final_result_after_failures(),
            request_timeout: default_client_timeout(),
            url_check_timeout: default_url_check_timeout(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: Some(DEFAULT_MAX_CONNECTIONS),
            },
            web: WebConfig {
                host: default_host(),
                port: default_port(),
                base_url: default_base_url(),
                max_upload_bytes: default_max_upload_bytes(),
            },
            storage: StorageConfig {
                media_path: default_media_path(),
            },
            translation: TranslationConfig::default(),
            redis: RedisConfig::default(),
            logs: LogsConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    /// Load configuration from a TOML file merged with `CATTERY_` environment
    /// overrides. A missing file is created with the default configuration.
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if !std::path::Path::new(config_file).exists() {
            let contents = toml::to_string_pretty(&Self::default())?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
        }

        let config: Config = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    /// Public URL of a stored media file
    pub fn media_url(&self, media_id: &uuid::Uuid) -> String {
        format!(
            "{}/api/media/{}/file",
            self.web.base_url.trim_end_matches('/'),
            media_id
        )
    }
}
