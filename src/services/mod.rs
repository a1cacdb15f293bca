//! Service layer for business logic
//!
//! Services sit between the web handlers and the repository layer. They own
//! validation, lifecycle rules and activity logging for each domain:
//!
//! - [`CatService`]: cat profiles, soft delete and parentage
//! - [`MediaService`]: uploads, trash, locking and purge
//! - [`LogArchiveService`]: archive/delete runs tracked by [`OperationManager`]
//! - [`LogHousekeeper`]: retention of archived logs
//! - [`SettingsService`]: SEO settings document
//!
//! Every mutating operation records a log entry through [`ActivityLogger`].

pub mod activity;
pub mod cat;
pub mod log_archive;
pub mod log_housekeeper;
pub mod media;
pub mod operations;
pub mod settings;

pub use activity::ActivityLogger;
pub use cat::CatService;
pub use log_archive::LogArchiveService;
pub use log_housekeeper::{HousekeepingReport, LogHousekeeper};
pub use media::MediaService;
pub use operations::{
    OperationManager, OperationProgress, OperationResult, OperationState, OperationType,
};
pub use settings::SettingsService;
