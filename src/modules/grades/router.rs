use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{
    create_grade, delete_grade, filter_grades, get_report_card, get_subject_average, list_grades,
    list_my_grades, update_grade,
};

pub fn init_grades_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_grade).get(list_grades))
        .route("/mine", get(list_my_grades))
        .route("/filter", get(filter_grades))
        .route("/report-card/{student_id}", get(get_report_card))
        .route("/average/{subject}", get(get_subject_average))
        .route("/{id}", put(update_grade).delete(delete_grade))
}
