//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::notify::NotificationRegistry;
use crate::services::auth::JwtKeys;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    jwt: JwtKeys,
    registry: NotificationRegistry,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: AppConfig, pool: PgPool) -> Self {
        let jwt = JwtKeys::new(&config.jwt_secret, config.token_ttl);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                jwt,
                registry: NotificationRegistry::new(),
            }),
        }
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the token signing keys.
    #[must_use]
    pub fn jwt(&self) -> &JwtKeys {
        &self.inner.jwt
    }

    /// Get a reference to the live notification registry.
    #[must_use]
    pub fn registry(&self) -> &NotificationRegistry {
        &self.inner.registry
    }
}
