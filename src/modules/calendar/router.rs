use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{
    create_calendar_entry, delete_calendar_entry, list_calendar_entries, list_class_calendar,
    update_calendar_entry,
};

pub fn init_calendar_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_calendar_entry).get(list_calendar_entries))
        .route("/class/{class_id}", get(list_class_calendar))
        .route(
            "/{id}",
            put(update_calendar_entry).delete(delete_calendar_entry),
        )
}
