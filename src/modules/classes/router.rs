use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{add_students, create_class, list_classes, remove_students, update_class};

pub fn init_classes_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_classes).post(create_class))
        .route("/{id}", put(update_class))
        .route("/{id}/students", post(add_students).delete(remove_students))
}
