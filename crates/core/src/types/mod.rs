//! Core types for Receipt Studio.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod session_id;

pub use email::{Email, EmailError};
pub use id::*;
pub use session_id::SessionId;
