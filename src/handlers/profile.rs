//! Self-service profile endpoints.

use crate::{
    backend::{BackendError, RequestClient},
    error::ApiError,
    models::{
        AuthAuditEvent, AuthEventOutcome, AuthEventType, EmailChangeResponse, Envelope,
        UpdateEmailRequest,
    },
    utils::validate_email,
};
use actix_web::{Error, HttpRequest, HttpResponse, Result, web};
use paperclip::actix::api_v2_operation;

/// Current user's profile
#[api_v2_operation(
    summary = "Get Profile",
    description = "Returns the profile of the signed-in user, including the role.",
    tags("Profile"),
    responses(
        (status = 200, description = "Profile"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Profile not found")
    )
)]
pub async fn get_profile(req: HttpRequest) -> Result<HttpResponse, Error> {
    let client = RequestClient::from_request(&req)?;
    let user = client.require_user()?;

    let profile = client
        .backend()
        .fetch_profile(client.access_token(), user.id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found("Profile"))?;
    Ok(Envelope::ok(profile))
}

/// Request an email change
#[api_v2_operation(
    summary = "Change Email",
    description = "Starts an email change. The new address takes effect after it is confirmed.",
    tags("Profile"),
    responses(
        (status = 200, description = "Change requested"),
        (status = 400, description = "Validation error or change rejected"),
        (status = 401, description = "Authentication required")
    )
)]
pub async fn update_email(
    req: HttpRequest,
    payload: web::Json<UpdateEmailRequest>,
) -> Result<HttpResponse, Error> {
    let client = RequestClient::from_request(&req)?;
    let user = client.require_user()?;
    let token = client.access_token().ok_or_else(ApiError::unauthenticated)?;
    let email = validate_email(payload.email.as_deref())?;

    match client.backend().update_email(token, &email).await {
        Ok(_) => {
            AuthAuditEvent::from_request(
                &req,
                AuthEventType::EmailChangeRequested,
                AuthEventOutcome::Success,
            )
            .with_user_id(Some(user.id.to_string()))
            .with_email(Some(email.clone()))
            .log();

            Ok(Envelope::ok(EmailChangeResponse {
                email,
                pending_confirmation: true,
            }))
        }
        Err(e) => {
            AuthAuditEvent::from_request(
                &req,
                AuthEventType::EmailChangeRequested,
                AuthEventOutcome::Failure,
            )
            .with_user_id(Some(user.id.to_string()))
            .with_reason(Some(e.to_string()))
            .log();

            Err(match e {
                BackendError::Auth { .. } => ApiError::BadRequest {
                    code: "EMAIL_UPDATE_FAILED",
                    message: "Unable to change the email address".to_string(),
                },
                other => other.into(),
            }
            .into())
        }
    }
}
