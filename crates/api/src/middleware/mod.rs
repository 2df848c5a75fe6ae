//! HTTP middleware pipeline.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers + `TraceLayer` (observability)
//! 2. CORS (answers preflight, merges access-control headers)
//! 3. Request ID (add unique ID to each request)
//! 4. Error normalizer (uniform JSON error bodies)
//! 5. Panic catcher (panic becomes a 500)
//! 6. Router, then per route: auth guard (`route_layer`) and the
//!    [`ValidatedJson`] body extractor

pub mod auth;
pub mod cookie;
pub mod cors;
pub mod errors;
pub mod request_id;
pub mod validate;

pub use auth::{RequireAuth, auth_guard};
pub use cookie::{CookieCodec, SESSION_COOKIE_NAME};
pub use cors::{CorsPolicy, cors_middleware};
pub use errors::{catch_panic_layer, error_normalizer};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use validate::{FieldKind, FieldSpec, RequestSchema, ValidatedJson, at_least_one_of};
