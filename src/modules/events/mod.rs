pub mod controller;
pub mod model;
pub mod router;
pub mod service;
pub mod timeline;

pub use model::*;
pub use router::init_events_router;
