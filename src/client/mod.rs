//! Client side of the admin API
//!
//! [`AdminClient`] wraps the HTTP endpoints with a short-lived response
//! cache and request deduplication. [`ArchivePoller`] follows a log archive
//! operation until it finishes or polling has to be abandoned.

pub mod api;
pub mod poller;
pub mod response_cache;

pub use api::AdminClient;
pub use poller::{ArchivePoller, ArchiveStatusSource, PollOutcome};
pub use response_cache::ResponseCache;
