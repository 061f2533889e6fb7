pub use escola_models::calendar::*;
