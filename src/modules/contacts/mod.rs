pub mod availability;
pub mod controller;
pub mod model;
pub mod router;
pub mod search;
pub mod service;

pub use model::*;
pub use router::init_contacts_router;
