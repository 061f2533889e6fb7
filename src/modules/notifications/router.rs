use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

use super::controller::{
    list_my_notifications, mark_notification_read, register_device_token, remove_device_tokens,
};

pub fn init_notifications_router() -> Router<AppState> {
    Router::new()
        .route("/mine", get(list_my_notifications))
        .route("/{id}/read", patch(mark_notification_read))
        .route(
            "/device-token",
            post(register_device_token).delete(remove_device_tokens),
        )
}
