//! Entities, request/response DTOs and enums shared by the Escola API and CLI.

pub mod announcements;
pub mod attendance;
pub mod auth;
pub mod calendar;
pub mod classes;
pub mod contacts;
pub mod dashboard;
pub mod events;
pub mod grades;
pub mod ids;
pub mod notifications;
pub mod report_card;
pub mod tasks;
pub mod users;

pub use ids::*;
