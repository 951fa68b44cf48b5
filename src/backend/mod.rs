//! Hosted auth/data backend.
//!
//! The application never owns storage: accounts, sessions and rows live in a
//! Supabase-style backend whose row-level-security policies are the source of
//! truth for authorization. Every data call carries the caller's access token
//! (or none, for anonymous reads) so that those policies apply.

pub mod client;
pub mod memory;
pub mod supabase;

pub use client::*;
pub use memory::*;
pub use supabase::*;

use crate::{
    config::{BackendConfig, BackendMode, ConfigError},
    error::ApiError,
    models::{
        AuthSession, AuthUser, EntryFilter, KbEntry, KbEntryPatch, KbNote, NewKbEntry, NewKbNote,
        Profile, SignUpOutcome,
    },
};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Errors reported by a backend call
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("row not found")]
    NotFound,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("auth provider rejected the request ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("database error {code}: {message}")]
    Database { code: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound => ApiError::not_found("Resource"),
            BackendError::PermissionDenied(_) => {
                ApiError::forbidden("You do not have permission to perform this action")
            }
            BackendError::Unauthorized(_) | BackendError::Auth { .. } => {
                ApiError::unauthenticated()
            }
            BackendError::Database { code, message } => {
                ApiError::Database(format!("{code}: {message}"))
            }
            BackendError::Transport(msg) | BackendError::Decode(msg) => ApiError::Database(msg),
        }
    }
}

/// Auth and data operations offered by the backend
///
/// `access_token` is `None` for anonymous callers; the backend then applies
/// its anonymous policies.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpOutcome, BackendError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError>;

    /// Send a recovery email; unknown addresses are not reported
    async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), BackendError>;

    /// Exchange a recovery code from the reset email for a session
    async fn verify_recovery(&self, code: &str) -> Result<AuthSession, BackendError>;

    async fn update_password(&self, access_token: &str, password: &str)
    -> Result<(), BackendError>;

    /// Start an email change; the new address takes effect once confirmed
    async fn update_email(&self, access_token: &str, email: &str)
    -> Result<AuthUser, BackendError>;

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError>;

    async fn fetch_profile(
        &self,
        access_token: Option<&str>,
        user_id: Uuid,
    ) -> Result<Option<Profile>, BackendError>;

    async fn list_entries(
        &self,
        access_token: Option<&str>,
        filter: &EntryFilter,
    ) -> Result<Vec<KbEntry>, BackendError>;

    async fn get_entry(
        &self,
        access_token: Option<&str>,
        id: Uuid,
    ) -> Result<Option<KbEntry>, BackendError>;

    async fn insert_entry(
        &self,
        access_token: Option<&str>,
        entry: &NewKbEntry,
    ) -> Result<KbEntry, BackendError>;

    /// `None` when no visible row matched
    async fn update_entry(
        &self,
        access_token: Option<&str>,
        id: Uuid,
        patch: &KbEntryPatch,
    ) -> Result<Option<KbEntry>, BackendError>;

    /// `false` when no visible row matched
    async fn delete_entry(&self, access_token: Option<&str>, id: Uuid)
    -> Result<bool, BackendError>;

    async fn list_notes(
        &self,
        access_token: Option<&str>,
        entry_id: Uuid,
    ) -> Result<Vec<KbNote>, BackendError>;

    async fn insert_note(
        &self,
        access_token: Option<&str>,
        note: &NewKbNote,
    ) -> Result<KbNote, BackendError>;

    async fn delete_note(&self, access_token: Option<&str>, id: Uuid)
    -> Result<bool, BackendError>;

    /// Cheap reachability probe for the health endpoint
    async fn ping(&self) -> Result<(), BackendError>;
}

pub type SharedBackend = Arc<dyn Backend>;

/// Build the backend selected by configuration
pub fn backend_from_config(config: &BackendConfig) -> Result<SharedBackend, ConfigError> {
    match config.mode {
        BackendMode::Supabase => Ok(Arc::new(SupabaseBackend::new(config)?)),
        BackendMode::Memory => {
            tracing::warn!("Using the in-memory backend; data is lost on restart");
            Ok(Arc::new(MemoryBackend::new()))
        }
    }
}
