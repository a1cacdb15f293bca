pub mod client;
pub mod config;
pub mod database;
pub mod entities;
pub mod errors;
pub mod models;
pub mod services;
pub mod storage;
pub mod translation;
pub mod utils;
pub mod web;
