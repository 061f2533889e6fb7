use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Account role. Stored in the `user_role` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Guardian,
    Teacher,
    Manager,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Guardian => "guardian",
            UserRole::Teacher => "teacher",
            UserRole::Manager => "manager",
        }
    }

    /// Teachers and managers may record grades, attendance and events.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Teacher | UserRole::Manager)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&UserRole::Guardian).unwrap(),
            r#""guardian""#
        );
        let role: UserRole = serde_json::from_str(r#""teacher""#).unwrap();
        assert_eq!(role, UserRole::Teacher);
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!(serde_json::from_str::<UserRole>(r#""admin""#).is_err());
    }

    #[test]
    fn test_is_staff() {
        assert!(UserRole::Teacher.is_staff());
        assert!(UserRole::Manager.is_staff());
        assert!(!UserRole::Student.is_staff());
        assert!(!UserRole::Guardian.is_staff());
    }
}
