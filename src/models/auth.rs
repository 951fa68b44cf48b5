//! Authentication-related data models.

use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request model for sign-in and sign-up
#[derive(Debug, Serialize, Deserialize, Apiv2Schema)]
pub struct CredentialsRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request model for starting a password reset
#[derive(Debug, Serialize, Deserialize, Apiv2Schema)]
pub struct ResetRequest {
    pub email: Option<String>,
}

/// Request model for completing a password reset
///
/// `code` is the recovery token from the reset email. Without it the caller
/// must already hold a session.
#[derive(Debug, Serialize, Deserialize, Apiv2Schema)]
pub struct ResetChangeRequest {
    pub password: Option<String>,
    pub code: Option<String>,
}

/// User identity as reported by the auth provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Tokens issued by the auth provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user: AuthUser,
}

/// Result of a sign-up call
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// Auto-confirmed accounts receive a session immediately
    SignedIn(AuthSession),
    /// The account exists but the email must be confirmed first
    ConfirmationRequired(AuthUser),
}

/// Response model for sign-in
#[derive(Debug, Serialize, Deserialize)]
pub struct SignInResponse {
    pub user: AuthUser,
}

/// Response model for sign-up
#[derive(Debug, Serialize, Deserialize)]
pub struct SignUpResponse {
    pub user: AuthUser,
    pub requires_confirmation: bool,
}

/// Generic acknowledgement body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
