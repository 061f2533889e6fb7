use axum::{
    Router,
    routing::{get, patch, post, put},
};

use crate::state::AppState;

use super::controller::{
    cancel_event, create_event, list_events, list_events_by_period, update_event,
};

pub fn init_events_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_event).get(list_events))
        .route("/period/{period}", get(list_events_by_period))
        .route("/{id}", put(update_event))
        .route("/{id}/cancel", patch(cancel_event))
}
