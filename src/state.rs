use escola_config::{CorsConfig, JwtConfig, NotificationConfig};
use sqlx::PgPool;

use crate::modules::notifications::dispatcher::NotificationDispatcher;

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
    pub notification_config: NotificationConfig,
    /// Fire-and-forget handle to the notification worker
    pub notifier: NotificationDispatcher,
}

impl AppState {
    pub fn new(db: PgPool, notifier: NotificationDispatcher) -> Self {
        Self {
            db,
            jwt_config: JwtConfig::from_env(),
            cors_config: CorsConfig::from_env(),
            notification_config: NotificationConfig::from_env(),
            notifier,
        }
    }
}
