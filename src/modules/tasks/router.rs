use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{create_task, delete_task, list_my_tasks, list_teacher_tasks, update_task};

pub fn init_tasks_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_task))
        .route("/mine", get(list_my_tasks))
        .route("/teacher", get(list_teacher_tasks))
        .route("/{id}", put(update_task).delete(delete_task))
}
