use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

use super::controller::{
    get_student_attendance, justify_absence, list_class_attendance, record_attendance,
};

pub fn init_attendance_router() -> Router<AppState> {
    Router::new()
        .route("/", post(record_attendance))
        .route("/class/{class_id}", get(list_class_attendance))
        .route("/{id}/justify", patch(justify_absence))
        .route("/student/{student_id}", get(get_student_attendance))
}
