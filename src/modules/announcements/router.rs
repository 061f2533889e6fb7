use axum::{
    Router,
    routing::{post, put},
};

use crate::state::AppState;

use super::controller::{
    create_announcement, delete_announcement, list_announcements, mark_announcement_read,
    update_announcement,
};

pub fn init_announcements_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_announcement).get(list_announcements))
        .route("/{id}/read", post(mark_announcement_read))
        .route("/{id}", put(update_announcement).delete(delete_announcement))
}
