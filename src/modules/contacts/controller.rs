use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Local;
use escola_core::AppError;
use escola_models::ContactId;
use tracing::instrument;

use crate::middleware::auth::{AuthUser, RequireManager};
use crate::modules::contacts::model::{
    Contact, ContactFilterParams, ContactListResponse, ContactSearchParams, ContactSearchResponse,
    CreateContactDto, UpdateContactDto,
};
use crate::modules::contacts::search;
use crate::modules::contacts::service::ContactService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/contacts",
    params(ContactFilterParams),
    responses(
        (status = 200, description = "Active contacts grouped by kind", body = ContactListResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Contacts",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_contacts(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(filters): Query<ContactFilterParams>,
) -> Result<Json<ContactListResponse>, AppError> {
    let response = ContactService::list_contacts(&state.db, filters).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/contacts/search",
    params(ContactSearchParams),
    responses(
        (status = 200, description = "Ranked contacts with current availability", body = ContactSearchResponse),
        (status = 400, description = "Malformed day or time"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Contacts",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn search_contacts(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(params): Query<ContactSearchParams>,
) -> Result<Json<ContactSearchResponse>, AppError> {
    let contacts = ContactService::active_contacts(&state.db).await?;
    let response = search::search(contacts, &params, Local::now().naive_local());
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/contacts/{id}",
    params(("id" = Uuid, Path, description = "Contact ID")),
    responses(
        (status = 200, description = "Contact", body = Contact),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Contact not found")
    ),
    tag = "Contacts",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_contact(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<ContactId>,
) -> Result<Json<Contact>, AppError> {
    let contact = ContactService::find_by_id(&state.db, id).await?;
    Ok(Json(contact))
}

#[utoipa::path(
    post,
    path = "/api/contacts",
    request_body = CreateContactDto,
    responses(
        (status = 201, description = "Contact created", body = Contact),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Managers only"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User already has a contact card"),
        (status = 422, description = "Invalid office hours or email")
    ),
    tag = "Contacts",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_contact(
    State(state): State<AppState>,
    RequireManager(_auth_user): RequireManager,
    ValidatedJson(dto): ValidatedJson<CreateContactDto>,
) -> Result<(StatusCode, Json<Contact>), AppError> {
    let contact = ContactService::create_contact(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

#[utoipa::path(
    put,
    path = "/api/contacts/{id}",
    params(("id" = Uuid, Path, description = "Contact ID")),
    request_body = UpdateContactDto,
    responses(
        (status = 200, description = "Contact updated", body = Contact),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only a manager or the contact's own user"),
        (status = 404, description = "Contact not found"),
        (status = 422, description = "Invalid office hours or email")
    ),
    tag = "Contacts",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_contact(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<ContactId>,
    ValidatedJson(dto): ValidatedJson<UpdateContactDto>,
) -> Result<Json<Contact>, AppError> {
    let contact = ContactService::update_contact(&state.db, auth_user.caller()?, id, dto).await?;
    Ok(Json(contact))
}
