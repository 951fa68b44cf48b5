//! Authentication endpoint handlers.
//!
//! Provider error detail never reaches the client; it is recorded on the
//! `auth_audit` log target instead.

use crate::{
    backend::RequestClient,
    config::AuthConfig,
    error::ApiError,
    models::{
        AuthAuditEvent, AuthEventOutcome, AuthEventType, CredentialsRequest, MessageResponse,
        ResetChangeRequest, ResetRequest, SignInResponse, SignUpOutcome, SignUpResponse,
        Envelope,
    },
    services::enforce_rate_limit,
    utils::{
        cleared_cookies, session_cookies, validate_credentials, validate_email,
        validate_password_change,
    },
};
use actix_web::{Error, HttpRequest, HttpResponse, HttpResponseBuilder, Result, cookie::Cookie, web};
use paperclip::actix::api_v2_operation;

const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists for this email, a password reset link has been sent.";

fn auth_config(req: &HttpRequest) -> AuthConfig {
    req.app_data::<web::Data<AuthConfig>>()
        .map(|c| c.get_ref().clone())
        .unwrap_or_default()
}

fn with_cookies(mut builder: HttpResponseBuilder, cookies: [Cookie<'static>; 2]) -> HttpResponseBuilder {
    for cookie in cookies {
        builder.cookie(cookie);
    }
    builder
}

/// Sign in with email and password
#[api_v2_operation(
    summary = "Sign In",
    description = "Authenticates with email and password and sets the session cookies.",
    tags("Authentication"),
    responses(
        (status = 200, description = "Signed in"),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many requests")
    )
)]
pub async fn signin(
    req: HttpRequest,
    payload: web::Json<CredentialsRequest>,
) -> Result<HttpResponse, Error> {
    enforce_rate_limit(&req, "signin").await?;
    let credentials = validate_credentials(&payload)?;
    let client = RequestClient::from_request(&req)?;

    match client
        .backend()
        .sign_in(&credentials.email, &credentials.password)
        .await
    {
        Ok(session) => {
            AuthAuditEvent::from_request(&req, AuthEventType::SignIn, AuthEventOutcome::Success)
                .with_user_id(Some(session.user.id.to_string()))
                .with_email(Some(credentials.email))
                .log();

            let cookies = session_cookies(&session, &auth_config(&req));
            Ok(with_cookies(HttpResponse::Ok(), cookies)
                .json(Envelope::new(SignInResponse { user: session.user })))
        }
        Err(e) => {
            AuthAuditEvent::from_request(&req, AuthEventType::SignIn, AuthEventOutcome::Failure)
                .with_email(Some(credentials.email))
                .with_reason(Some(e.to_string()))
                .log();

            Err(ApiError::Unauthorized {
                code: "INVALID_CREDENTIALS",
                message: "Invalid email or password".to_string(),
            }
            .into())
        }
    }
}

/// Create an account
#[api_v2_operation(
    summary = "Sign Up",
    description = "Registers a new account. When the provider auto-confirms, the session cookies are set immediately.",
    tags("Authentication"),
    responses(
        (status = 201, description = "Account created"),
        (status = 400, description = "Validation error or sign-up rejected"),
        (status = 429, description = "Too many requests")
    )
)]
pub async fn signup(
    req: HttpRequest,
    payload: web::Json<CredentialsRequest>,
) -> Result<HttpResponse, Error> {
    enforce_rate_limit(&req, "signup").await?;
    let credentials = validate_credentials(&payload)?;
    let client = RequestClient::from_request(&req)?;
    let config = auth_config(&req);

    let outcome = client
        .backend()
        .sign_up(
            &credentials.email,
            &credentials.password,
            config.signup_redirect_url.as_deref(),
        )
        .await;

    match outcome {
        Ok(SignUpOutcome::SignedIn(session)) => {
            AuthAuditEvent::from_request(&req, AuthEventType::SignUp, AuthEventOutcome::Success)
                .with_user_id(Some(session.user.id.to_string()))
                .with_email(Some(credentials.email))
                .log();

            let cookies = session_cookies(&session, &config);
            Ok(with_cookies(HttpResponse::Created(), cookies).json(Envelope::new(
                SignUpResponse {
                    user: session.user,
                    requires_confirmation: false,
                },
            )))
        }
        Ok(SignUpOutcome::ConfirmationRequired(user)) => {
            AuthAuditEvent::from_request(&req, AuthEventType::SignUp, AuthEventOutcome::Success)
                .with_user_id(Some(user.id.to_string()))
                .with_email(Some(credentials.email))
                .with_reason(Some("confirmation required".to_string()))
                .log();

            Ok(Envelope::created(SignUpResponse {
                user,
                requires_confirmation: true,
            }))
        }
        Err(e) => {
            AuthAuditEvent::from_request(&req, AuthEventType::SignUp, AuthEventOutcome::Failure)
                .with_email(Some(credentials.email))
                .with_reason(Some(e.to_string()))
                .log();

            Err(ApiError::BadRequest {
                code: "SIGNUP_FAILED",
                message: "Unable to create the account".to_string(),
            }
            .into())
        }
    }
}

/// End the current session
#[api_v2_operation(
    summary = "Sign Out",
    description = "Revokes the session at the provider when possible and clears the session cookies.",
    tags("Authentication"),
    responses((status = 200, description = "Signed out"))
)]
pub async fn signout(req: HttpRequest) -> Result<HttpResponse, Error> {
    let client = RequestClient::from_request(&req)?;
    let user_id = client.user().map(|u| u.id.to_string());

    if let Some(token) = client.access_token() {
        if let Err(e) = client.backend().sign_out(token).await {
            tracing::warn!(error = %e, "Provider sign-out failed; clearing cookies anyway");
        }
    }

    AuthAuditEvent::from_request(&req, AuthEventType::SignOut, AuthEventOutcome::Success)
        .with_user_id(user_id)
        .log();

    let cookies = cleared_cookies(&auth_config(&req));
    Ok(with_cookies(HttpResponse::Ok(), cookies).json(Envelope::new(MessageResponse {
        message: "Signed out".to_string(),
    })))
}

/// Start a password reset
///
/// Always answers with the same message so that callers cannot probe which
/// addresses have accounts.
#[api_v2_operation(
    summary = "Request Password Reset",
    description = "Sends a password reset email when the account exists.",
    tags("Authentication"),
    responses(
        (status = 200, description = "Request accepted"),
        (status = 400, description = "Validation error"),
        (status = 429, description = "Too many requests")
    )
)]
pub async fn reset_request(
    req: HttpRequest,
    payload: web::Json<ResetRequest>,
) -> Result<HttpResponse, Error> {
    enforce_rate_limit(&req, "reset").await?;
    let email = validate_email(payload.email.as_deref())?;
    let client = RequestClient::from_request(&req)?;
    let config = auth_config(&req);

    let result = client
        .backend()
        .request_password_reset(&email, config.reset_redirect_url.as_deref())
        .await;

    let (outcome, reason) = match result {
        Ok(()) => (AuthEventOutcome::Success, None),
        Err(e) => {
            tracing::warn!(error = %e, "Password reset request failed at the provider");
            (AuthEventOutcome::Failure, Some(e.to_string()))
        }
    };
    AuthAuditEvent::from_request(&req, AuthEventType::PasswordResetRequested, outcome)
        .with_email(Some(email))
        .with_reason(reason)
        .log();

    Ok(Envelope::ok(MessageResponse {
        message: RESET_REQUESTED_MESSAGE.to_string(),
    }))
}

/// Set a new password
///
/// With a recovery `code` the code is exchanged for a session first, which
/// also signs the caller in. Without one the current session is used.
#[api_v2_operation(
    summary = "Change Password",
    description = "Completes a password reset with the recovery code, or changes the password of the signed-in user.",
    tags("Authentication"),
    responses(
        (status = 200, description = "Password updated"),
        (status = 400, description = "Validation error, invalid reset token or rejected password"),
        (status = 401, description = "No recovery code and no session")
    )
)]
pub async fn reset_change(
    req: HttpRequest,
    payload: web::Json<ResetChangeRequest>,
) -> Result<HttpResponse, Error> {
    let (password, code) = validate_password_change(&payload)?;
    let client = RequestClient::from_request(&req)?;
    let config = auth_config(&req);

    let (access_token, user_id, recovered) = match code {
        Some(code) => match client.backend().verify_recovery(&code).await {
            Ok(session) => (
                session.access_token.clone(),
                session.user.id.to_string(),
                Some(session),
            ),
            Err(e) => {
                AuthAuditEvent::from_request(
                    &req,
                    AuthEventType::PasswordChanged,
                    AuthEventOutcome::Failure,
                )
                .with_reason(Some(e.to_string()))
                .log();
                return Err(ApiError::BadRequest {
                    code: "INVALID_RESET_TOKEN",
                    message: "The reset link is invalid or has expired".to_string(),
                }
                .into());
            }
        },
        None => {
            let user = client.require_user()?;
            let token = client.access_token().ok_or_else(ApiError::unauthenticated)?;
            (token.to_string(), user.id.to_string(), None)
        }
    };

    if let Err(e) = client.backend().update_password(&access_token, &password).await {
        AuthAuditEvent::from_request(&req, AuthEventType::PasswordChanged, AuthEventOutcome::Failure)
            .with_user_id(Some(user_id))
            .with_reason(Some(e.to_string()))
            .log();
        return Err(ApiError::BadRequest {
            code: "PASSWORD_UPDATE_FAILED",
            message: "Unable to update the password".to_string(),
        }
        .into());
    }

    AuthAuditEvent::from_request(&req, AuthEventType::PasswordChanged, AuthEventOutcome::Success)
        .with_user_id(Some(user_id))
        .log();

    let body = Envelope::new(MessageResponse {
        message: "Password updated".to_string(),
    });
    Ok(match recovered {
        Some(session) => {
            with_cookies(HttpResponse::Ok(), session_cookies(&session, &config)).json(body)
        }
        None => HttpResponse::Ok().json(body),
    })
}
