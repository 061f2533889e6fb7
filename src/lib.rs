//! # Escola API
//!
//! REST backend for a school: grades and report cards, attendance, events and
//! the academic calendar, announcements, tasks, a staff directory with
//! office-hour availability, in-app and push notifications, and role-specific
//! dashboards.
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── middleware/      # Bearer-token extractors and role guards
//! ├── modules/         # Feature modules
//! │   ├── auth/           # Register, login, refresh, profile
//! │   ├── classes/        # Teacher-owned classes and rosters
//! │   ├── grades/         # Grades, report cards, averages
//! │   ├── attendance/     # Sessions, justification, student reports
//! │   ├── events/         # Events and period timelines
//! │   ├── calendar/       # Academic calendar
//! │   ├── announcements/  # Targeted announcements, read receipts
//! │   ├── tasks/          # Teacher-assigned tasks
//! │   ├── contacts/       # Staff directory and availability
//! │   ├── notifications/  # Queue, worker, push delivery
//! │   └── dashboard/      # Role-specific home screen
//! ├── docs.rs          # OpenAPI document
//! ├── logging.rs       # Tracing subscriber and request logging
//! ├── metrics.rs       # Prometheus recorder and counters
//! ├── router.rs        # Route tree and layers
//! ├── state.rs         # Shared application state
//! └── validator.rs     # Validated JSON extractor
//! ```
//!
//! Each feature module has `controller.rs` (axum handlers), `service.rs`
//! (business rules and queries), `model.rs` (types from `escola-models`) and
//! `router.rs`.
//!
//! ## Roles
//!
//! | Role | Created by | Highlights |
//! |------|------------|------------|
//! | Student | self-registration | own grades, tasks, class events |
//! | Guardian | self-registration | dependents' grades and alerts |
//! | Teacher | self-registration | classes, grades, attendance, tasks |
//! | Manager | `escola-cli create-manager` | everything, contacts directory |
//!
//! ## API Documentation
//!
//! - Swagger UI: `http://localhost:5000/swagger-ui`
//! - Scalar: `http://localhost:5000/scalar`

pub mod docs;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;
pub mod validator;

// Re-export workspace crates for convenience
pub use escola_auth;
pub use escola_config;
pub use escola_core;
pub use escola_db;
pub use escola_models;
