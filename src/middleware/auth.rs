use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use escola_auth::{Claims, verify_token};
use escola_core::{AppError, UserRole};
use escola_models::UserId;

use crate::state::AppState;

/// Identity and role of the authenticated user, passed down to services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    pub role: UserRole,
}

/// Extractor that validates the bearer token and exposes its claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> Result<UserId, AppError> {
        self.0
            .sub
            .parse::<UserId>()
            .map_err(|_| AppError::unauthorized("Invalid user ID in token"))
    }

    pub fn caller(&self) -> Result<Caller, AppError> {
        Ok(Caller {
            id: self.user_id()?,
            role: self.0.role,
        })
    }

    pub fn role(&self) -> UserRole {
        self.0.role
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.0.role == role
    }

    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        roles.contains(&self.0.role)
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid authorization header format"))?;

        let claims = verify_token(token, &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

/// Declares an extractor that admits only the listed roles.
#[macro_export]
macro_rules! require_roles {
    ($name:ident, [$($role:expr),+ $(,)?]) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub $crate::middleware::auth::AuthUser);

        impl axum::extract::FromRequestParts<$crate::state::AppState> for $name {
            type Rejection = escola_core::AppError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &$crate::state::AppState,
            ) -> Result<Self, Self::Rejection> {
                let auth_user =
                    $crate::middleware::auth::AuthUser::from_request_parts(parts, state).await?;

                if !auth_user.has_any_role(&[$($role),+]) {
                    return Err(escola_core::AppError::forbidden(format!(
                        "Access denied for role {}",
                        auth_user.role()
                    )));
                }

                Ok($name(auth_user))
            }
        }
    };
}

require_roles!(RequireStudent, [UserRole::Student]);
require_roles!(RequireTeacher, [UserRole::Teacher]);
require_roles!(RequireManager, [UserRole::Manager]);
require_roles!(RequireStaff, [UserRole::Teacher, UserRole::Manager]);
require_roles!(RequireLearner, [UserRole::Student, UserRole::Guardian]);

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn auth_user(sub: String, role: UserRole) -> AuthUser {
        AuthUser(Claims {
            sub,
            email: "ana@escola.test".to_string(),
            name: "Ana".to_string(),
            role,
            exp: 9_999_999_999,
            iat: 1_234_567_890,
        })
    }

    #[test]
    fn test_user_id() {
        let id = Uuid::new_v4();
        let user = auth_user(id.to_string(), UserRole::Student);
        assert_eq!(user.user_id().unwrap(), UserId::from_uuid(id));
        assert_eq!(
            user.caller().unwrap(),
            Caller {
                id: UserId::from_uuid(id),
                role: UserRole::Student
            }
        );
    }

    #[test]
    fn test_malformed_subject_is_unauthorized() {
        let user = auth_user("not-a-uuid".to_string(), UserRole::Student);
        let err = user.user_id().unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_role_checks() {
        let user = auth_user(Uuid::new_v4().to_string(), UserRole::Teacher);
        assert!(user.has_role(UserRole::Teacher));
        assert!(!user.has_role(UserRole::Manager));
        assert!(user.has_any_role(&[UserRole::Teacher, UserRole::Manager]));
        assert!(!user.has_any_role(&[UserRole::Student, UserRole::Guardian]));
        assert_eq!(user.name(), "Ana");
    }
}
