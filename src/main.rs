use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cattery_admin::{
    config::{CacheBackendKind, Config},
    database::Database,
    storage::MediaStorage,
    translation::{
        CacheBackend, DeepLProvider, MemoryCacheBackend, RedisCacheBackend, TranslationCache,
        TranslationProvider, TranslationService,
    },
    web::{AppState, WebServer},
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "cattery-admin")]
#[command(version)]
#[command(about = "Admin backend for a cattery website")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn init_tracing(cli: &Cli) {
    let log_filter = if cli.log_level == "trace" {
        format!("cattery_admin={},tower_http=trace", cli.log_level)
    } else {
        format!("cattery_admin={},tower_http=info", cli.log_level)
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| log_filter.into());

    match cli.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Redis when configured and reachable, otherwise the in-process cache
async fn cache_backend(config: &Config) -> Arc<dyn CacheBackend> {
    if config.translation.cache_backend == CacheBackendKind::Memory {
        info!("Using in-memory translation cache");
        return Arc::new(MemoryCacheBackend::new());
    }

    let redis = match RedisCacheBackend::new(&config.redis.url) {
        Ok(redis) => redis,
        Err(e) => {
            warn!("Invalid Redis URL, falling back to in-memory translation cache: {}", e);
            return Arc::new(MemoryCacheBackend::new());
        }
    };
    match redis.ping().await {
        Ok(()) => {
            info!("Using Redis translation cache at {}", config.redis.url);
            Arc::new(redis)
        }
        Err(e) => {
            warn!("Redis unavailable, falling back to in-memory translation cache: {}", e);
            Arc::new(MemoryCacheBackend::new())
        }
    }
}

fn translation_provider(config: &Config) -> Result<Option<Arc<dyn TranslationProvider>>> {
    let translation = &config.translation;
    let api_key = translation
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty());

    match api_key {
        Some(key) if translation.enabled => {
            let provider =
                DeepLProvider::new(&translation.api_url, key, translation.request_timeout)?;
            info!("Translation provider configured: {}", translation.api_url);
            Ok(Some(Arc::new(provider)))
        }
        _ => {
            warn!("Translation is not configured; texts will be returned untranslated");
            Ok(None)
        }
    }
}

async fn shutdown_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down gracefully"),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C, shutting down gracefully");
    }

    token.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    info!("Starting cattery admin v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }
    let config = Arc::new(config);

    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    info!("Database connection established and migrations applied");

    let storage = MediaStorage::new(config.storage.media_path.clone());
    storage.ensure_storage_dirs().await?;
    info!("Media storage ready at {:?}", storage.base_dir());

    let cache = TranslationCache::from_config(cache_backend(&config).await, &config.translation);
    let translation = TranslationService::new(cache, translation_provider(&config)?);

    let state = AppState::new(database, config.clone(), storage, translation);
    let shutdown = CancellationToken::new();

    info!(
        "Log housekeeper: archived logs kept for {}, checked every {}",
        humantime::format_duration(config.logs.archive_retention),
        humantime::format_duration(config.logs.housekeeper_interval)
    );
    let housekeeper = state.housekeeper();
    let housekeeper_handle = tokio::spawn(housekeeper.start(shutdown.clone()));

    let web_server = WebServer::new(state)?;
    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );

    tokio::spawn(shutdown_signal(shutdown.clone()));

    let result = web_server.serve_with_cancellation(shutdown.clone()).await;
    shutdown.cancel();
    if let Err(e) = housekeeper_handle.await {
        error!("Log housekeeper task failed: {}", e);
    }

    if let Err(e) = &result {
        error!("Web server failed: {}", e);
    }
    info!("Shutdown complete");
    result
}
