pub use escola_models::classes::*;
