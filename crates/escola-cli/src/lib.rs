//! # Escola CLI
//!
//! Account bootstrap and database seeding for local development.
//!
//! ```ignore
//! use escola_cli::seeder::{seed_all, SeedConfig};
//!
//! let config = SeedConfig::new(4).with_teachers(3).with_students(30);
//! seed_all(&pool, config).await?;
//! ```

pub mod managers;
pub mod seeder;
