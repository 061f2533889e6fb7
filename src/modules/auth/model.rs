pub use escola_models::auth::*;
pub use escola_models::users::User;
