pub use escola_models::tasks::*;
