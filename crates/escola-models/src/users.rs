//! User accounts.

use chrono::{DateTime, Utc};
use escola_core::UserRole;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::ids::UserId;

/// Public view of an account; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    /// School enrollment number, students only
    pub enrollment: Option<String>,
    pub phone: Option<String>,
    /// Guardian responsible for this student
    pub guardian_id: Option<UserId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row used during login; includes the bcrypt hash.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub is_active: bool,
}

/// Minimal reference embedded in other payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

pub const USER_COLUMNS: &str =
    "id, name, email, role, enrollment, phone, guardian_id, is_active, created_at, updated_at";
