//! Notes attached to knowledge-base entries.

use crate::{
    backend::RequestClient,
    error::ApiError,
    handlers::kb::entry_error,
    models::{CreateKbNoteRequest, Envelope, NewKbNote},
    utils::{parse_uuid, validate_note},
};
use actix_web::{Error, HttpRequest, HttpResponse, Result, web};
use paperclip::actix::api_v2_operation;

/// List the caller's notes on an entry
#[api_v2_operation(
    summary = "List Notes",
    description = "Lists the caller's notes on an entry the caller can read.",
    tags("Knowledge Base"),
    responses(
        (status = 200, description = "Notes"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Entry not found")
    )
)]
pub async fn list_notes(req: HttpRequest, path: web::Path<String>) -> Result<HttpResponse, Error> {
    let entry_id = parse_uuid("id", &path)?;
    let client = RequestClient::from_request(&req)?;
    client.require_user()?;

    client
        .get_entry(entry_id)
        .await
        .map_err(entry_error)?
        .ok_or_else(|| ApiError::not_found("Entry"))?;

    let notes = client.list_notes(entry_id).await.map_err(entry_error)?;
    Ok(Envelope::ok(notes))
}

/// Attach a note to an entry
#[api_v2_operation(
    summary = "Create Note",
    description = "Adds a private note to an entry the caller can read.",
    tags("Knowledge Base"),
    responses(
        (status = 201, description = "Note created"),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Entry not found")
    )
)]
pub async fn create_note(
    req: HttpRequest,
    path: web::Path<String>,
    payload: web::Json<CreateKbNoteRequest>,
) -> Result<HttpResponse, Error> {
    let entry_id = parse_uuid("id", &path)?;
    let client = RequestClient::from_request(&req)?;
    let user = client.require_user()?;
    let body = validate_note(&payload)?;

    client
        .get_entry(entry_id)
        .await
        .map_err(entry_error)?
        .ok_or_else(|| ApiError::not_found("Entry"))?;

    let note = client
        .insert_note(&NewKbNote {
            entry_id,
            user_id: user.id,
            body,
        })
        .await
        .map_err(entry_error)?;
    Ok(Envelope::created(note))
}

/// Delete a note
#[api_v2_operation(
    summary = "Delete Note",
    description = "Deletes a note owned by the caller. Admins may delete any note.",
    tags("Knowledge Base"),
    responses(
        (status = 204, description = "Note deleted"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Note not found")
    )
)]
pub async fn delete_note(req: HttpRequest, path: web::Path<String>) -> Result<HttpResponse, Error> {
    let id = parse_uuid("id", &path)?;
    let client = RequestClient::from_request(&req)?;
    client.require_user()?;

    let deleted = client.delete_note(id).await.map_err(|e| match e {
        crate::backend::BackendError::NotFound => ApiError::not_found("Note"),
        other => other.into(),
    })?;
    if !deleted {
        return Err(ApiError::not_found("Note").into());
    }
    Ok(HttpResponse::NoContent().finish())
}
