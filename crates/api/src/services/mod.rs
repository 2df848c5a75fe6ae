//! Business logic services for the receipts API.
//!
//! # Services
//!
//! - `auth` - Password accounts and the session lifecycle around them
//! - `sweep` - Periodic deletion of expired sessions

pub mod auth;
pub mod sweep;
