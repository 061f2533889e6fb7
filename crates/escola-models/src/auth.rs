//! Registration, login and token DTOs.

use escola_core::UserRole;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::ids::UserId;
use crate::users::User;

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.len();
    if (10..=11).contains(&digits) && phone.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("phone")
            .with_message("phone must have 10 or 11 digits".into()))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 100, message = "name must have between 3 and 100 characters"))]
    pub name: String,
    #[validate(email(message = "email is invalid"))]
    pub email: String,
    #[validate(length(min = 6, message = "password must have at least 6 characters"))]
    pub password: String,
    pub role: UserRole,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    /// Required for students
    #[validate(length(min = 1, max = 50, message = "enrollment must have between 1 and 50 characters"))]
    pub enrollment: Option<String>,
    /// Links a student to an existing guardian account
    pub guardian_id: Option<UserId>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "email is invalid"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "refresh_token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register() -> RegisterRequest {
        RegisterRequest {
            name: "Maria Souza".to_string(),
            email: "maria@escola.test".to_string(),
            password: "segredo".to_string(),
            role: UserRole::Student,
            phone: Some("11987654321".to_string()),
            enrollment: Some("2024001".to_string()),
            guardian_id: None,
        }
    }

    #[test]
    fn test_valid_register() {
        assert!(register().validate().is_ok());
    }

    #[test]
    fn test_short_name_and_password_rejected() {
        let mut dto = register();
        dto.name = "Al".to_string();
        assert!(dto.validate().is_err());

        let mut dto = register();
        dto.password = "12345".to_string();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_phone_must_be_10_or_11_digits() {
        let mut dto = register();
        dto.phone = Some("1198765432".to_string());
        assert!(dto.validate().is_ok());

        dto.phone = Some("119876543".to_string());
        assert!(dto.validate().is_err());

        dto.phone = Some("(11)98765-43".to_string());
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_login_requires_email() {
        let dto = LoginRequest {
            email: "not-an-email".to_string(),
            password: "x".to_string(),
        };
        assert!(dto.validate().is_err());
    }
}
