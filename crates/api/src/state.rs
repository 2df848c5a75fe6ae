//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{ApiConfig, Environment};
use crate::db::{
    MemoryStore, PgReceiptStore, PgSessionStore, PgUserStore, ReceiptStore, SessionStore,
    UserStore,
};
use crate::middleware::{CookieCodec, CorsPolicy};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Stores are held as trait
/// objects so the same router runs against `PostgreSQL` or [`MemoryStore`].
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    environment: Environment,
    cookies: CookieCodec,
    cors: CorsPolicy,
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    receipts: Arc<dyn ReceiptStore>,
}

impl AppState {
    /// Create state backed by `PostgreSQL`.
    #[must_use]
    pub fn new(config: &ApiConfig, pool: PgPool) -> Self {
        Self::with_stores(
            config.environment,
            CorsPolicy::new(config.allowed_origins.iter().cloned()),
            Arc::new(PgSessionStore::new(pool.clone())),
            Arc::new(PgUserStore::new(pool.clone())),
            Arc::new(PgReceiptStore::new(pool)),
        )
    }

    /// Create state backed entirely by one [`MemoryStore`].
    #[must_use]
    pub fn in_memory(store: MemoryStore, environment: Environment, cors: CorsPolicy) -> Self {
        Self::with_stores(
            environment,
            cors,
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store),
        )
    }

    /// Create state from explicit store implementations.
    #[must_use]
    pub fn with_stores(
        environment: Environment,
        cors: CorsPolicy,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
        receipts: Arc<dyn ReceiptStore>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                environment,
                cookies: CookieCodec::new(environment),
                cors,
                sessions,
                users,
                receipts,
            }),
        }
    }

    /// Deployment environment.
    #[must_use]
    pub fn environment(&self) -> Environment {
        self.inner.environment
    }

    /// Session cookie codec.
    #[must_use]
    pub fn cookies(&self) -> &CookieCodec {
        &self.inner.cookies
    }

    /// CORS policy.
    #[must_use]
    pub fn cors(&self) -> &CorsPolicy {
        &self.inner.cors
    }

    /// Session store.
    #[must_use]
    pub fn sessions(&self) -> &dyn SessionStore {
        self.inner.sessions.as_ref()
    }

    /// Shared handle to the session store, for background tasks.
    #[must_use]
    pub fn session_store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.inner.sessions)
    }

    /// User store.
    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.users.as_ref()
    }

    /// Receipt store.
    #[must_use]
    pub fn receipts(&self) -> &dyn ReceiptStore {
        self.inner.receipts.as_ref()
    }
}
