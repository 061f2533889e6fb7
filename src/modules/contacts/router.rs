use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    create_contact, get_contact, list_contacts, search_contacts, update_contact,
};

pub fn init_contacts_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_contact).get(list_contacts))
        .route("/search", get(search_contacts))
        .route("/{id}", get(get_contact).put(update_contact))
}
