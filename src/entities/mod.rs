//! SeaORM entity definitions for the relational store
//!
//! One entity per table: `cats`, `media`, `logs` and `settings`.

pub mod prelude;

pub mod cats;
pub mod logs;
pub mod media;
pub mod settings;
