use anyhow::anyhow;
use escola_auth::{create_access_token, create_refresh_token, verify_refresh_token};
use escola_config::JwtConfig;
use escola_core::{AppError, UserRole, hash_password, verify_password};
use escola_models::UserId;
use escola_models::users::{USER_COLUMNS, UserCredentials};
use sqlx::PgPool;
use tracing::instrument;

use crate::metrics;
use crate::modules::auth::model::{AuthResponse, LoginRequest, RegisterRequest, User};

/// Role rules that the DTO's field validators cannot express.
pub fn check_registration(dto: &RegisterRequest) -> Result<(), AppError> {
    match dto.role {
        UserRole::Manager => Err(AppError::bad_request(anyhow!(
            "Manager accounts cannot be self-registered"
        ))),
        UserRole::Student if dto.enrollment.as_deref().is_none_or(|e| e.trim().is_empty()) => Err(
            AppError::bad_request(anyhow!("Enrollment is required for students")),
        ),
        UserRole::Student => Ok(()),
        _ if dto.guardian_id.is_some() => Err(AppError::bad_request(anyhow!(
            "Only students can be linked to a guardian"
        ))),
        _ => Ok(()),
    }
}

pub struct AuthService;

impl AuthService {
    fn issue_tokens(user: User, jwt_config: &JwtConfig) -> Result<AuthResponse, AppError> {
        let access_token = create_access_token(
            user.id.into_inner(),
            &user.email,
            &user.name,
            user.role,
            jwt_config,
        )?;
        let refresh_token = create_refresh_token(user.id.into_inner(), &user.email, jwt_config)?;
        metrics::track_jwt_issued();

        Ok(AuthResponse {
            user,
            access_token,
            refresh_token,
        })
    }

    #[instrument(skip(db))]
    pub async fn find_user(db: &PgPool, id: UserId) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("User not found")))
    }

    #[instrument(skip(db, dto, jwt_config), fields(email = %dto.email, role = %dto.role))]
    pub async fn register_user(
        db: &PgPool,
        dto: RegisterRequest,
        jwt_config: &JwtConfig,
    ) -> Result<AuthResponse, AppError> {
        check_registration(&dto)?;

        if let Some(guardian_id) = dto.guardian_id {
            let is_guardian = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND role = 'guardian' AND is_active)",
            )
            .bind(guardian_id)
            .fetch_one(db)
            .await?;

            if !is_guardian {
                return Err(AppError::bad_request(anyhow!("Guardian not found")));
            }
        }

        let hashed_password = hash_password(&dto.password)?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"INSERT INTO users (name, email, password, role, phone, enrollment, guardian_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {}"#,
            USER_COLUMNS
        ))
        .bind(dto.name.trim())
        .bind(dto.email.trim().to_lowercase())
        .bind(&hashed_password)
        .bind(dto.role)
        .bind(&dto.phone)
        .bind(dto.enrollment.as_deref().map(str::trim))
        .bind(dto.guardian_id)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::bad_request(anyhow!("Email or enrollment already registered"));
                }
            }
            AppError::from(e)
        })?;

        metrics::track_user_registered(user.role.as_str());
        tracing::info!(user_id = %user.id, "User registered");

        Self::issue_tokens(user, jwt_config)
    }

    #[instrument(skip(db, dto, jwt_config), fields(email = %dto.email))]
    pub async fn login_user(
        db: &PgPool,
        dto: LoginRequest,
        jwt_config: &JwtConfig,
    ) -> Result<AuthResponse, AppError> {
        let credentials = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, name, email, password, role, is_active FROM users WHERE email = $1",
        )
        .bind(dto.email.trim().to_lowercase())
        .fetch_optional(db)
        .await?;

        let Some(credentials) = credentials else {
            metrics::track_user_login_failure("unknown_email");
            return Err(AppError::unauthorized("Invalid credentials"));
        };

        if !credentials.is_active {
            metrics::track_user_login_failure("inactive");
            return Err(AppError::unauthorized("User is inactive"));
        }

        if !verify_password(&dto.password, &credentials.password)? {
            metrics::track_user_login_failure("wrong_password");
            return Err(AppError::unauthorized("Invalid credentials"));
        }

        let user = Self::find_user(db, credentials.id).await?;
        metrics::track_user_login_success(user.role.as_str());

        Self::issue_tokens(user, jwt_config)
    }

    #[instrument(skip_all)]
    pub async fn refresh_tokens(
        db: &PgPool,
        refresh_token: &str,
        jwt_config: &JwtConfig,
    ) -> Result<AuthResponse, AppError> {
        let claims = verify_refresh_token(refresh_token, jwt_config)?;
        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| AppError::unauthorized("Invalid user ID in token"))?;

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1 AND is_active",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::unauthorized("User is inactive"))?;

        Self::issue_tokens(user, jwt_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(role: UserRole) -> RegisterRequest {
        RegisterRequest {
            name: "Maria Souza".to_string(),
            email: "maria@escola.test".to_string(),
            password: "segredo".to_string(),
            role,
            phone: None,
            enrollment: None,
            guardian_id: None,
        }
    }

    #[test]
    fn test_managers_cannot_register() {
        let err = check_registration(&register(UserRole::Manager)).unwrap_err();
        assert_eq!(err.status.as_u16(), 400);
    }

    #[test]
    fn test_students_need_enrollment() {
        let mut dto = register(UserRole::Student);
        assert!(check_registration(&dto).is_err());

        dto.enrollment = Some("   ".to_string());
        assert!(check_registration(&dto).is_err());

        dto.enrollment = Some("2024001".to_string());
        dto.guardian_id = Some(UserId::new());
        assert!(check_registration(&dto).is_ok());
    }

    #[test]
    fn test_only_students_have_guardians() {
        let mut dto = register(UserRole::Teacher);
        assert!(check_registration(&dto).is_ok());

        dto.guardian_id = Some(UserId::new());
        assert!(check_registration(&dto).is_err());
    }
}
