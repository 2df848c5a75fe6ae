//! Receipt Studio Core - Shared types library.
//!
//! This crate provides common types used across all Receipt Studio components:
//! - `api` - Account, session and receipt persistence HTTP service
//! - `cli` - Command-line tools for migrations and session maintenance
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, session tokens and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
