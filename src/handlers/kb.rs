//! Knowledge-base entry handlers.
//!
//! Reads go through the caller's token so the backend's row policies decide
//! visibility. Writes are checked up front by [`crate::services::access`]
//! and then again by the backend.

use crate::{
    backend::{BackendError, RequestClient},
    error::ApiError,
    models::{CreateKbEntryRequest, Envelope, KbEntryQuery, UpdateKbEntryRequest},
    services::access::{ensure_can_change_visibility, ensure_can_create, ensure_can_modify},
    utils::{parse_uuid, validate_entry_filter, validate_entry_patch, validate_new_entry},
};
use actix_web::{Error, HttpRequest, HttpResponse, Result, web};
use paperclip::actix::api_v2_operation;
use tracing::info;

/// Backend failures on entry routes; a missing row is reported as the entry
pub(crate) fn entry_error(err: BackendError) -> ApiError {
    match err {
        BackendError::NotFound => ApiError::not_found("Entry"),
        other => other.into(),
    }
}

/// List entries visible to the caller
#[api_v2_operation(
    summary = "List Entries",
    description = "Lists knowledge-base entries visible to the caller, newest first. Supports full-text search (`q`) and a tag filter.",
    tags("Knowledge Base"),
    responses(
        (status = 200, description = "Entries"),
        (status = 400, description = "Invalid query parameters")
    )
)]
pub async fn list_entries(
    req: HttpRequest,
    query: web::Query<KbEntryQuery>,
) -> Result<HttpResponse, Error> {
    let filter = validate_entry_filter(&query)?;
    let client = RequestClient::from_request(&req)?;
    let entries = client.list_entries(&filter).await.map_err(entry_error)?;
    Ok(Envelope::ok(entries))
}

/// Create an entry owned by the caller
#[api_v2_operation(
    summary = "Create Entry",
    description = "Creates a knowledge-base entry. Only admins may create public entries.",
    tags("Knowledge Base"),
    responses(
        (status = 201, description = "Entry created"),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not allowed to publish")
    )
)]
pub async fn create_entry(
    req: HttpRequest,
    payload: web::Json<CreateKbEntryRequest>,
) -> Result<HttpResponse, Error> {
    let client = RequestClient::from_request(&req)?;
    let user = client.require_user()?;
    let entry = validate_new_entry(user.id, &payload)?;
    ensure_can_create(user, entry.is_public)?;

    let created = client.insert_entry(&entry).await.map_err(entry_error)?;
    info!(entry_id = %created.id, user_id = %user.id, is_public = created.is_public, "Entry created");
    Ok(Envelope::created(created))
}

/// Fetch one entry
#[api_v2_operation(
    summary = "Get Entry",
    description = "Returns an entry when it is public or owned by the caller. Invisible entries are reported as not found.",
    tags("Knowledge Base"),
    responses(
        (status = 200, description = "Entry"),
        (status = 400, description = "Invalid id"),
        (status = 404, description = "Entry not found")
    )
)]
pub async fn get_entry(req: HttpRequest, path: web::Path<String>) -> Result<HttpResponse, Error> {
    let id = parse_uuid("id", &path)?;
    let client = RequestClient::from_request(&req)?;
    let entry = client
        .get_entry(id)
        .await
        .map_err(entry_error)?
        .ok_or_else(|| ApiError::not_found("Entry"))?;
    Ok(Envelope::ok(entry))
}

/// Update an entry
#[api_v2_operation(
    summary = "Update Entry",
    description = "Partially updates an entry. Owners may edit their private entries; only admins may edit public entries or change visibility.",
    tags("Knowledge Base"),
    responses(
        (status = 200, description = "Entry updated"),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not allowed to modify the entry"),
        (status = 404, description = "Entry not found")
    )
)]
pub async fn update_entry(
    req: HttpRequest,
    path: web::Path<String>,
    payload: web::Json<UpdateKbEntryRequest>,
) -> Result<HttpResponse, Error> {
    let id = parse_uuid("id", &path)?;
    let client = RequestClient::from_request(&req)?;
    let user = client.require_user()?;
    let patch = validate_entry_patch(&payload)?;

    let existing = client
        .get_entry(id)
        .await
        .map_err(entry_error)?
        .ok_or_else(|| ApiError::not_found("Entry"))?;
    ensure_can_modify(user, &existing)?;
    ensure_can_change_visibility(user, &existing, patch.is_public)?;

    let updated = client
        .update_entry(id, &patch)
        .await
        .map_err(entry_error)?
        .ok_or_else(|| ApiError::not_found("Entry"))?;
    info!(entry_id = %id, user_id = %user.id, "Entry updated");
    Ok(Envelope::ok(updated))
}

/// Delete an entry
#[api_v2_operation(
    summary = "Delete Entry",
    description = "Deletes an entry and its notes. Owners may delete their private entries; only admins may delete public entries.",
    tags("Knowledge Base"),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 400, description = "Invalid id"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not allowed to delete the entry"),
        (status = 404, description = "Entry not found")
    )
)]
pub async fn delete_entry(req: HttpRequest, path: web::Path<String>) -> Result<HttpResponse, Error> {
    let id = parse_uuid("id", &path)?;
    let client = RequestClient::from_request(&req)?;
    let user = client.require_user()?;

    let existing = client
        .get_entry(id)
        .await
        .map_err(entry_error)?
        .ok_or_else(|| ApiError::not_found("Entry"))?;
    ensure_can_modify(user, &existing)?;

    if !client.delete_entry(id).await.map_err(entry_error)? {
        return Err(ApiError::not_found("Entry").into());
    }
    info!(entry_id = %id, user_id = %user.id, "Entry deleted");
    Ok(HttpResponse::NoContent().finish())
}
