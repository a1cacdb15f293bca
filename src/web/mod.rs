//! Web layer module
//!
//! HTTP interface of the cattery admin backend. Handlers are thin and
//! delegate to the service layer; every response uses the envelope from
//! [`responses`].
//!
//! # Routes
//!
//! - `/health`
//! - `/api/cats`: profiles, trash, parentage
//! - `/api/media`: uploads, external URLs, trash, locks, file serving
//! - `/api/logs`: activity log, background archive and delete operations
//! - `/api/translate`: cached translation
//! - `/api/settings/seo`: SEO settings

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    config::Config,
    database::{
        Database,
        repositories::{
            CatSeaOrmRepository, LogEntrySeaOrmRepository, MediaSeaOrmRepository,
            SettingsSeaOrmRepository,
        },
    },
    services::{
        ActivityLogger, CatService, LogArchiveService, LogHousekeeper, MediaService,
        OperationManager, SettingsService,
    },
    storage::MediaStorage,
    translation::TranslationService,
};

pub mod extractors;
pub mod handlers;
pub mod responses;
pub mod utils;

pub use extractors::{ACTOR_HEADER, ApiQuery, IdPath, RequestContext};
pub use responses::{ApiResponse, handle_error, handle_result};

/// Room for multipart framing on top of the upload limit
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub config: Arc<Config>,
    pub activity: ActivityLogger,
    pub cats: CatService,
    pub media: MediaService,
    pub operations: OperationManager,
    pub logs: LogArchiveService,
    pub settings: SettingsService,
    pub translation: TranslationService,
}

impl AppState {
    /// Wire the services on top of one database connection
    pub fn new(
        database: Database,
        config: Arc<Config>,
        storage: MediaStorage,
        translation: TranslationService,
    ) -> Self {
        let connection = database.connection();
        let activity = ActivityLogger::new(LogEntrySeaOrmRepository::new(connection.clone()));
        let cats = CatService::new(CatSeaOrmRepository::new(connection.clone()), activity.clone());
        let media = MediaService::new(
            MediaSeaOrmRepository::new(connection.clone()),
            cats.clone(),
            storage,
            activity.clone(),
            config.clone(),
        );
        let operations = OperationManager::new(config.logs.operation_ttl);
        let logs = LogArchiveService::new(
            LogEntrySeaOrmRepository::new(connection.clone()),
            operations.clone(),
            activity.clone(),
            config.logs.clone(),
        );
        let settings = SettingsService::new(SettingsSeaOrmRepository::new(connection), activity.clone());

        Self {
            database,
            config,
            activity,
            cats,
            media,
            operations,
            logs,
            settings,
            translation,
        }
    }

    /// Housekeeper sharing this state's operation records
    pub fn housekeeper(&self) -> LogHousekeeper {
        LogHousekeeper::from_config(
            LogEntrySeaOrmRepository::new(self.database.connection()),
            self.operations.clone(),
            self.activity.clone(),
            &self.config.logs,
        )
    }
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", state.config.web.host, state.config.web.port)
            .parse()
            .context("Invalid listen address")?;
        let app = create_router(state);
        Ok(Self { app, addr })
    }

    /// Serve until `cancellation_token` is cancelled
    pub async fn serve_with_cancellation(self, cancellation_token: CancellationToken) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .with_context(|| format!("Failed to bind to {}", self.addr))?;
        info!("Listening on http://{}", self.addr);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                cancellation_token.cancelled().await;
                info!("Web server received cancellation signal, shutting down gracefully");
            })
            .await?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Create the router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.web.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(cat_routes())
        .merge(media_routes())
        .merge(log_routes())
        .merge(translation_routes())
        .route(
            "/settings/seo",
            get(handlers::settings::get_seo_settings).put(handlers::settings::update_seo_settings),
        )
}

fn cat_routes() -> Router<AppState> {
    use handlers::cats;

    Router::new()
        .route("/cats", get(cats::list_cats).post(cats::create_cat))
        .route(
            "/cats/{id}",
            get(cats::get_cat)
                .patch(cats::update_cat)
                .delete(cats::delete_cat),
        )
        .route("/cats/{id}/restore", post(cats::restore_cat))
        .route("/cats/{id}/permanent", axum::routing::delete(cats::purge_cat))
        .route("/cats/{id}/views", post(cats::record_cat_view))
        .route("/cats/{id}/children", get(cats::list_children))
}

fn media_routes() -> Router<AppState> {
    use handlers::media;

    Router::new()
        .route("/media", get(media::list_media).post(media::upload_media))
        .route("/media/external", post(media::register_external_media))
        .route("/media/trash", get(media::list_trash))
        .route("/media/stats", get(media::media_stats))
        .route("/media/empty-trash", post(media::empty_trash))
        .route("/media/{id}", get(media::get_media).delete(media::trash_media))
        .route("/media/{id}/file", get(media::serve_media_file))
        .route("/media/{id}/restore", post(media::restore_media))
        .route(
            "/media/{id}/lock",
            post(media::lock_media).delete(media::unlock_media),
        )
        .route("/media/{id}/permanent", axum::routing::delete(media::purge_media))
}

fn log_routes() -> Router<AppState> {
    use handlers::logs;

    Router::new()
        .route("/logs", get(logs::list_logs).post(logs::create_log))
        .route("/logs/archive", post(logs::archive_logs))
        .route("/logs/delete", post(logs::delete_logs))
        .route("/logs/operations/{id}/progress", get(logs::operation_progress))
        .route("/logs/operations/{id}/result", get(logs::operation_result))
}

fn translation_routes() -> Router<AppState> {
    use handlers::translate;

    Router::new()
        .route("/translate", post(translate::translate))
        .route("/translate/batch", post(translate::translate_batch))
        .route("/translate/stats", get(translate::translation_stats))
        .route(
            "/translate/cache",
            axum::routing::delete(translate::clear_translation_cache),
        )
        .route("/translate/usage", get(translate::translation_usage))
}
