//! # Escola Core
//!
//! Foundational types shared by every crate in the workspace:
//!
//! - [`errors`]: the HTTP-aware [`AppError`]
//! - [`pagination`]: limit/offset query parameters and response metadata
//! - [`password`]: bcrypt hashing and verification
//! - [`roles`]: the [`UserRole`] enum stored in the `user_role` Postgres type
//! - [`serde`]: query-string deserialization helpers

pub mod errors;
pub mod pagination;
pub mod password;
pub mod roles;
pub mod serde;

pub use errors::AppError;
pub use pagination::{PaginationMeta, PaginationParams};
pub use password::{hash_password, verify_password};
pub use roles::UserRole;
