//! Domain models for the receipts API.
//!
//! These types represent validated domain objects separate from database row types.

pub mod receipt;
pub mod session;
pub mod user;

pub use receipt::{NewReceipt, Receipt, ReceiptChanges};
pub use session::{AuthenticatedUser, SESSION_TTL_SECONDS, Session};
pub use user::{LoginIdentity, NewUser, User};
