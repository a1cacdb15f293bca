//! SeaORM repository implementations
//!
//! Each repository owns a shared connection and maps between SeaORM models
//! and the domain models in [`crate::models`].

pub mod cat;
pub mod log_entry;
pub mod media;
pub mod settings;
pub mod traits;

pub use cat::CatSeaOrmRepository;
pub use log_entry::LogEntrySeaOrmRepository;
pub use media::MediaSeaOrmRepository;
pub use settings::SettingsSeaOrmRepository;
