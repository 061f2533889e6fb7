pub mod controller;
pub mod model;
pub mod report_card;
pub mod router;
pub mod service;

pub use model::*;
pub use router::init_grades_router;
