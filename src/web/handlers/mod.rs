//! Web handlers module
//!
//! HTTP request handlers organized by domain. Handlers stay thin: they
//! extract the request, call one service method and map the result.

pub mod cats;
pub mod health;
pub mod logs;
pub mod media;
pub mod settings;
pub mod translate;
