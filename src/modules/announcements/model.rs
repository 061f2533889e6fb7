pub use escola_models::announcements::*;
