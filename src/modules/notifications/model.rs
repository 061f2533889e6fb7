pub use escola_models::notifications::*;
