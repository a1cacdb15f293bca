/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Database defaults
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./data/cattery.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024; // 100MB, videos included

// Storage defaults
pub const DEFAULT_MEDIA_PATH: &str = "./data/media";

// Translation defaults
pub const DEFAULT_TRANSLATION_API_URL: &str = "https://api-free.deepl.com";
pub const DEFAULT_TRANSLATION_KEY_PREFIX: &str = "translation";
pub const DEFAULT_INDIVIDUAL_TTL: &str = "30d";
pub const DEFAULT_GROUPED_TTL: &str = "7d";
pub const DEFAULT_TRANSLATION_TIMEOUT: &str = "15s";

// Redis defaults
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

// Log archive defaults
pub const DEFAULT_ARCHIVE_AFTER_DAYS: u32 = 30;
pub const DEFAULT_ARCHIVE_RETENTION: &str = "90d";
pub const DEFAULT_HOUSEKEEPER_INTERVAL: &str = "1h";
pub const DEFAULT_OPERATION_TTL: &str = "1h";
pub const DEFAULT_ARCHIVE_BATCH_SIZE: u64 = 500;

// Client defaults
pub const DEFAULT_RESPONSE_CACHE_TTL: &str = "30s";
pub const DEFAULT_RESPONSE_CACHE_CAPACITY: usize = 256;
pub const DEFAULT_POLL_INTERVAL: &str = "2s";
pub const DEFAULT_MAX_POLL_FAILURES: u32 = 10;
pub const DEFAULT_FINAL_RESULT_AFTER_FAILURES: u32 = 3;
pub const DEFAULT_CLIENT_TIMEOUT: &str = "10s";
pub const DEFAULT_URL_CHECK_TIMEOUT: &str = "5s";
