use marquee_auth::{AuthSession, Authenticator, User};
use marquee_config::AppConfig;
use sqlx::SqlitePool;

use crate::ws::registry::RoomRegistry;
use crate::ApiError;

/// Shared state for every route. Cloning is cheap; the registry and pool are
/// reference-counted internally.
#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    authenticator: Authenticator,
    registry: RoomRegistry,
    config: AppConfig,
}

impl AppState {
    pub fn new(pool: SqlitePool, authenticator: Authenticator, config: AppConfig) -> Self {
        Self {
            pool,
            authenticator,
            registry: RoomRegistry::new(),
            config,
        }
    }

    pub fn db_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn authenticate(&self, token: &str) -> Result<(User, AuthSession), ApiError> {
        self.authenticator
            .authenticate_token(token)
            .await
            .map_err(ApiError::from)
    }
}
