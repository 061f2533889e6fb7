pub mod announcements;
pub mod attendance;
pub mod auth;
pub mod calendar;
pub mod classes;
pub mod contacts;
pub mod dashboard;
pub mod events;
pub mod grades;
pub mod notifications;
pub mod tasks;
