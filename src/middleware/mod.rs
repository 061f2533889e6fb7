//! Request extractors for authentication and role checks.
//!
//! 1. Client sends `Authorization: Bearer <token>`
//! 2. [`auth::AuthUser`] verifies the access token and exposes its claims
//! 3. Role extractors such as [`auth::RequireStaff`] reject other roles with 403
//!
//! ```ignore
//! use crate::middleware::auth::{AuthUser, RequireTeacher};
//!
//! async fn profile(auth_user: AuthUser) -> impl IntoResponse { /* any role */ }
//!
//! async fn create_class(RequireTeacher(auth_user): RequireTeacher) -> impl IntoResponse {
//!     // only teachers reach this point
//! }
//! ```

pub mod auth;
