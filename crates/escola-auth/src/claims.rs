use escola_core::UserRole;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// User ID (subject claim)
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    /// Expiration (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Refresh token claims. Lacks `role`, so it never decodes as [`Claims`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
    pub iat: usize,
    /// Unique token id
    pub jti: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_roundtrip_role_is_lowercase() {
        let claims = Claims {
            sub: "user-1".to_string(),
            email: "ana@escola.test".to_string(),
            name: "Ana".to_string(),
            role: UserRole::Teacher,
            exp: 2,
            iat: 1,
        };
        let json = serde_json::to_string(&claims).unwrap();
        assert!(json.contains(r#""role":"teacher""#));
    }

    #[test]
    fn test_refresh_claims_do_not_parse_as_access_claims() {
        let json = r#"{"sub":"u","email":"e@x.test","exp":2,"iat":1,"jti":"j"}"#;
        assert!(serde_json::from_str::<Claims>(json).is_err());
        assert!(serde_json::from_str::<RefreshTokenClaims>(json).is_ok());
    }
}
