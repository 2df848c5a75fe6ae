//! Receipts API library.
//!
//! Session-based accounts and saved receipts behind a middleware pipeline:
//! CORS, error normalization, an auth guard and request body validation.
//! The server binary and the integration tests both build on this crate.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use config::{ApiConfig, Environment};
pub use error::AppError;
pub use routes::app;
pub use state::AppState;
