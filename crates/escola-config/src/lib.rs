//! # Escola Config
//!
//! Configuration structures loaded from environment variables. Every struct
//! exposes `from_env()` and falls back to development defaults.
//!
//! - [`jwt`]: token signing secret and lifetimes
//! - [`cors`]: allowed browser origins
//! - [`server`]: bind address and pool sizing
//! - [`push`]: Firebase Cloud Messaging service account
//! - [`notifications`]: queue sizing and alert thresholds

pub mod cors;
pub mod jwt;
pub mod notifications;
pub mod push;
pub mod server;

pub use cors::CorsConfig;
pub use jwt::JwtConfig;
pub use notifications::NotificationConfig;
pub use push::PushConfig;
pub use server::ServerConfig;

pub(crate) fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
