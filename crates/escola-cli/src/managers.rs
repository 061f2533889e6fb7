//! Manager accounts can only be created from the command line.

use escola_core::{UserRole, hash_password};
use escola_models::UserId;
use sqlx::PgPool;

#[derive(Debug)]
pub enum CreateManagerError {
    EmailTaken,
    Hash(String),
    Database(sqlx::Error),
}

impl std::fmt::Display for CreateManagerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreateManagerError::EmailTaken => write!(f, "User with this email already exists"),
            CreateManagerError::Hash(msg) => write!(f, "Failed to hash password: {}", msg),
            CreateManagerError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for CreateManagerError {}

impl From<sqlx::Error> for CreateManagerError {
    fn from(e: sqlx::Error) -> Self {
        CreateManagerError::Database(e)
    }
}

pub async fn create_manager(
    db: &PgPool,
    name: &str,
    email: &str,
    password: &str,
) -> Result<UserId, CreateManagerError> {
    let hashed = hash_password(password).map_err(|e| CreateManagerError::Hash(e.error.to_string()))?;

    let id = sqlx::query_scalar::<_, UserId>(
        "INSERT INTO users (name, email, password, role)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (email) DO NOTHING
         RETURNING id",
    )
    .bind(name)
    .bind(email.to_lowercase())
    .bind(&hashed)
    .bind(UserRole::Manager)
    .fetch_optional(db)
    .await?;

    id.ok_or(CreateManagerError::EmailTaken)
}
