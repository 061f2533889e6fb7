pub use escola_models::contacts::*;
