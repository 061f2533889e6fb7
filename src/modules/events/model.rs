pub use escola_models::events::*;
