pub use escola_models::dashboard::*;
