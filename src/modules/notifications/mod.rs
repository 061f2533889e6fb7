pub mod controller;
pub mod dispatcher;
pub mod model;
pub mod push;
pub mod router;
pub mod service;

pub use dispatcher::{NotificationDispatcher, NotificationEvent, NotificationWorker};
pub use model::*;
pub use router::init_notifications_router;
