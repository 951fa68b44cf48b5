//! Profiles, roles and the per-request user identity.

use chrono::{DateTime, Utc};
use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-controlled role stored on the profile row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// Row of the `profiles` table, created by a backend trigger on sign-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// The authenticated caller, resolved by the session middleware
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Request model for a self-service email change
#[derive(Debug, Deserialize, Apiv2Schema)]
pub struct UpdateEmailRequest {
    pub email: Option<String>,
}

/// Response model for an accepted email change
#[derive(Debug, Serialize)]
pub struct EmailChangeResponse {
    pub email: String,
    pub pending_confirmation: bool,
}
