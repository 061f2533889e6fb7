//! # Escola Auth
//!
//! JWT handling for the Escola API.
//!
//! - **Access token** ([`Claims`]): carries user id, email, name and role so
//!   handlers can authorize without a database round-trip.
//! - **Refresh token** ([`RefreshTokenClaims`]): long-lived, exchanged for a
//!   fresh pair at `/api/auth/refresh`.

pub mod claims;
pub mod jwt;

pub use claims::{Claims, RefreshTokenClaims};
pub use jwt::{create_access_token, create_refresh_token, verify_refresh_token, verify_token};
