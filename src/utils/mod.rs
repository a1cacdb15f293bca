//! Utility modules shared across the service and client layers

pub mod dedup;

pub use dedup::RequestDeduplicator;
