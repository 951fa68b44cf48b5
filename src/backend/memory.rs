//! Process-local backend with the same row policies as the hosted database.
//!
//! Used for development without a Supabase project and as the backend of the
//! integration tests. Policies:
//!
//! - entries are readable by their owner, by anyone when public, and by admins;
//! - entries are written by their owner while private, or by an admin;
//! - only admins may set or clear `is_public`, and `user_id` never changes;
//! - notes belong to their author (admins see all) and attach only to readable entries.

use super::{Backend, BackendError};
use crate::models::{
    AuthSession, AuthUser, EntryFilter, KbEntry, KbEntryPatch, KbNote, NewKbEntry, NewKbNote,
    Profile, Role, SignUpOutcome,
};
use async_trait::async_trait;
use chrono::Utc;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use uuid::Uuid;

const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone)]
struct StoredUser {
    id: Uuid,
    email: String,
    password: String,
    confirmed: bool,
    pending_email: Option<String>,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, StoredUser>,
    access_tokens: HashMap<String, Uuid>,
    refresh_tokens: HashMap<String, Uuid>,
    recovery_codes: HashMap<String, Uuid>,
    profiles: HashMap<Uuid, Profile>,
    entries: HashMap<Uuid, KbEntry>,
    notes: HashMap<Uuid, KbNote>,
}

/// Authenticated caller as seen by the row policies
#[derive(Debug, Clone, Copy)]
struct Caller {
    id: Uuid,
    admin: bool,
}

impl MemoryState {
    fn user_by_email(&self, email: &str) -> Option<&StoredUser> {
        self.users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
    }

    fn issue_session(&mut self, user_id: Uuid) -> Result<AuthSession, BackendError> {
        let user = self.users.get(&user_id).ok_or(BackendError::NotFound)?;
        let session = AuthSession {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Uuid::new_v4().to_string(),
            expires_in: ACCESS_TOKEN_TTL_SECS,
            user: AuthUser {
                id: user.id,
                email: Some(user.email.clone()),
            },
        };
        self.access_tokens
            .insert(session.access_token.clone(), user_id);
        self.refresh_tokens
            .insert(session.refresh_token.clone(), user_id);
        Ok(session)
    }

    fn token_user(&self, access_token: &str) -> Result<Uuid, BackendError> {
        self.access_tokens
            .get(access_token)
            .copied()
            .ok_or_else(|| BackendError::Unauthorized("invalid JWT".to_string()))
    }

    /// Resolve the database role for a request; an unknown token is rejected
    fn caller(&self, access_token: Option<&str>) -> Result<Option<Caller>, BackendError> {
        let Some(token) = access_token else {
            return Ok(None);
        };
        let id = self.token_user(token)?;
        let admin = self
            .profiles
            .get(&id)
            .is_some_and(|p| p.role == Role::Admin);
        Ok(Some(Caller { id, admin }))
    }
}

fn can_read_entry(entry: &KbEntry, caller: Option<Caller>) -> bool {
    entry.is_public || caller.is_some_and(|c| c.admin || c.id == entry.user_id)
}

fn can_write_entry(entry: &KbEntry, caller: Option<Caller>) -> bool {
    caller.is_some_and(|c| c.admin || (c.id == entry.user_id && !entry.is_public))
}

fn can_access_note(note: &KbNote, caller: Option<Caller>) -> bool {
    caller.is_some_and(|c| c.admin || c.id == note.user_id)
}

fn rls_violation(table: &str) -> BackendError {
    BackendError::PermissionDenied(format!(
        "new row violates row-level security policy for table \"{table}\""
    ))
}

/// Case-insensitive match of every search term against title and URL
fn matches_search(entry: &KbEntry, search: &str) -> bool {
    let haystack = format!("{} {}", entry.title, entry.url_original).to_lowercase();
    search
        .split_whitespace()
        .all(|term| haystack.contains(&term.to_lowercase()))
}

/// In-memory auth and data backend
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    require_confirmation: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// New sign-ups must confirm their email before receiving a session
    pub fn with_email_confirmation(mut self) -> Self {
        self.require_confirmation = true;
        self
    }

    /// Create a confirmed account and its profile
    pub async fn add_user(&self, email: &str, password: &str, role: Role) -> AuthUser {
        let mut state = self.state.lock().await;
        let id = Uuid::new_v4();
        let now = Utc::now();
        state.users.insert(
            id,
            StoredUser {
                id,
                email: email.to_string(),
                password: password.to_string(),
                confirmed: true,
                pending_email: None,
            },
        );
        state.profiles.insert(
            id,
            Profile {
                id,
                email: Some(email.to_string()),
                role,
                created_at: Some(now),
                updated_at: Some(now),
            },
        );
        AuthUser {
            id,
            email: Some(email.to_string()),
        }
    }

    /// Recovery code most recently mailed to `email`
    pub async fn recovery_code_for(&self, email: &str) -> Option<String> {
        let state = self.state.lock().await;
        let user_id = state.user_by_email(email)?.id;
        state
            .recovery_codes
            .iter()
            .find(|(_, id)| **id == user_id)
            .map(|(code, _)| code.clone())
    }

    /// Invalidate an access token as if it had expired
    pub async fn expire_access_token(&self, access_token: &str) {
        self.state.lock().await.access_tokens.remove(access_token);
    }

    /// Drop a profile row, as when the sign-up trigger has not run yet
    pub async fn remove_profile(&self, user_id: Uuid) {
        self.state.lock().await.profiles.remove(&user_id);
    }

    /// Address awaiting confirmation after an email change
    pub async fn pending_email(&self, user_id: Uuid) -> Option<String> {
        self.state
            .lock()
            .await
            .users
            .get(&user_id)
            .and_then(|u| u.pending_email.clone())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let mut state = self.state.lock().await;
        let user_id = match state.user_by_email(email) {
            Some(user) if user.password == password && user.confirmed => user.id,
            Some(user) if user.password == password => {
                return Err(BackendError::Auth {
                    status: 400,
                    message: "Email not confirmed".to_string(),
                });
            }
            _ => {
                return Err(BackendError::Auth {
                    status: 400,
                    message: "Invalid login credentials".to_string(),
                });
            }
        };
        state.issue_session(user_id)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _redirect_to: Option<&str>,
    ) -> Result<SignUpOutcome, BackendError> {
        let mut state = self.state.lock().await;
        if state.user_by_email(email).is_some() {
            return Err(BackendError::Auth {
                status: 422,
                message: "User already registered".to_string(),
            });
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        state.users.insert(
            id,
            StoredUser {
                id,
                email: email.to_string(),
                password: password.to_string(),
                confirmed: !self.require_confirmation,
                pending_email: None,
            },
        );
        state.profiles.insert(
            id,
            Profile {
                id,
                email: Some(email.to_string()),
                role: Role::User,
                created_at: Some(now),
                updated_at: Some(now),
            },
        );

        if self.require_confirmation {
            Ok(SignUpOutcome::ConfirmationRequired(AuthUser {
                id,
                email: Some(email.to_string()),
            }))
        } else {
            state.issue_session(id).map(SignUpOutcome::SignedIn)
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        let user_id = state.token_user(access_token)?;
        state.access_tokens.remove(access_token);
        state.refresh_tokens.retain(|_, id| *id != user_id);
        Ok(())
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        let mut state = self.state.lock().await;
        let user_id =
            state
                .refresh_tokens
                .remove(refresh_token)
                .ok_or_else(|| BackendError::Auth {
                    status: 400,
                    message: "Invalid Refresh Token".to_string(),
                })?;
        state.issue_session(user_id)
    }

    async fn request_password_reset(
        &self,
        email: &str,
        _redirect_to: Option<&str>,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        if let Some(user_id) = state.user_by_email(email).map(|u| u.id) {
            state.recovery_codes.retain(|_, id| *id != user_id);
            state
                .recovery_codes
                .insert(Uuid::new_v4().simple().to_string(), user_id);
        }
        Ok(())
    }

    async fn verify_recovery(&self, code: &str) -> Result<AuthSession, BackendError> {
        let mut state = self.state.lock().await;
        let user_id = state
            .recovery_codes
            .remove(code)
            .ok_or_else(|| BackendError::Auth {
                status: 403,
                message: "Token has expired or is invalid".to_string(),
            })?;
        state.issue_session(user_id)
    }

    async fn update_password(
        &self,
        access_token: &str,
        password: &str,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        let user_id = state.token_user(access_token)?;
        let user = state.users.get_mut(&user_id).ok_or(BackendError::NotFound)?;
        if user.password == password {
            return Err(BackendError::Auth {
                status: 422,
                message: "New password should be different from the old password.".to_string(),
            });
        }
        user.password = password.to_string();
        Ok(())
    }

    async fn update_email(&self, access_token: &str, email: &str) -> Result<AuthUser, BackendError> {
        let mut state = self.state.lock().await;
        let user_id = state.token_user(access_token)?;
        if state
            .user_by_email(email)
            .is_some_and(|other| other.id != user_id)
        {
            return Err(BackendError::Auth {
                status: 422,
                message: "A user with this email address has already been registered".to_string(),
            });
        }
        let user = state.users.get_mut(&user_id).ok_or(BackendError::NotFound)?;
        user.pending_email = Some(email.to_string());
        Ok(AuthUser {
            id: user.id,
            email: Some(user.email.clone()),
        })
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let state = self.state.lock().await;
        let user_id = state.token_user(access_token)?;
        let user = state.users.get(&user_id).ok_or(BackendError::NotFound)?;
        Ok(AuthUser {
            id: user.id,
            email: Some(user.email.clone()),
        })
    }

    async fn fetch_profile(
        &self,
        access_token: Option<&str>,
        user_id: Uuid,
    ) -> Result<Option<Profile>, BackendError> {
        let state = self.state.lock().await;
        let caller = state.caller(access_token)?;
        if !caller.is_some_and(|c| c.admin || c.id == user_id) {
            return Ok(None);
        }
        Ok(state.profiles.get(&user_id).cloned())
    }

    async fn list_entries(
        &self,
        access_token: Option<&str>,
        filter: &EntryFilter,
    ) -> Result<Vec<KbEntry>, BackendError> {
        let state = self.state.lock().await;
        let caller = state.caller(access_token)?;

        let mut rows: Vec<KbEntry> = state
            .entries
            .values()
            .filter(|e| can_read_entry(e, caller))
            .filter(|e| filter.search.as_deref().is_none_or(|q| matches_search(e, q)))
            .filter(|e| filter.tag.as_ref().is_none_or(|t| e.tags.contains(t)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        Ok(rows
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn get_entry(
        &self,
        access_token: Option<&str>,
        id: Uuid,
    ) -> Result<Option<KbEntry>, BackendError> {
        let state = self.state.lock().await;
        let caller = state.caller(access_token)?;
        Ok(state
            .entries
            .get(&id)
            .filter(|e| can_read_entry(e, caller))
            .cloned())
    }

    async fn insert_entry(
        &self,
        access_token: Option<&str>,
        entry: &NewKbEntry,
    ) -> Result<KbEntry, BackendError> {
        let mut state = self.state.lock().await;
        let caller = state.caller(access_token)?;
        let allowed = caller.is_some_and(|c| c.id == entry.user_id && (!entry.is_public || c.admin));
        if !allowed {
            return Err(rls_violation("kb_entries"));
        }

        let now = Utc::now();
        let row = KbEntry {
            id: Uuid::new_v4(),
            user_id: entry.user_id,
            title: entry.title.clone(),
            url_original: entry.url_original.clone(),
            url_canonical: Some(entry.url_canonical.clone()),
            tags: entry.tags.clone(),
            is_public: entry.is_public,
            created_at: now,
            updated_at: now,
        };
        state.entries.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_entry(
        &self,
        access_token: Option<&str>,
        id: Uuid,
        patch: &KbEntryPatch,
    ) -> Result<Option<KbEntry>, BackendError> {
        let mut state = self.state.lock().await;
        let caller = state.caller(access_token)?;
        let Some(row) = state.entries.get_mut(&id) else {
            return Ok(None);
        };
        if !can_write_entry(row, caller) {
            return Ok(None);
        }
        let is_admin = caller.is_some_and(|c| c.admin);
        if patch.is_public.is_some_and(|p| p != row.is_public) && !is_admin {
            return Err(rls_violation("kb_entries"));
        }

        if let Some(title) = &patch.title {
            row.title = title.clone();
        }
        if let Some(url) = &patch.url_original {
            row.url_original = url.clone();
        }
        if let Some(url) = &patch.url_canonical {
            row.url_canonical = Some(url.clone());
        }
        if let Some(tags) = &patch.tags {
            row.tags = tags.clone();
        }
        if let Some(is_public) = patch.is_public {
            row.is_public = is_public;
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete_entry(&self, access_token: Option<&str>, id: Uuid) -> Result<bool, BackendError> {
        let mut state = self.state.lock().await;
        let caller = state.caller(access_token)?;
        let deletable = state
            .entries
            .get(&id)
            .is_some_and(|e| can_write_entry(e, caller));
        if !deletable {
            return Ok(false);
        }
        state.entries.remove(&id);
        state.notes.retain(|_, n| n.entry_id != id);
        Ok(true)
    }

    async fn list_notes(
        &self,
        access_token: Option<&str>,
        entry_id: Uuid,
    ) -> Result<Vec<KbNote>, BackendError> {
        let state = self.state.lock().await;
        let caller = state.caller(access_token)?;
        let mut notes: Vec<KbNote> = state
            .notes
            .values()
            .filter(|n| n.entry_id == entry_id && can_access_note(n, caller))
            .cloned()
            .collect();
        notes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(notes)
    }

    async fn insert_note(
        &self,
        access_token: Option<&str>,
        note: &NewKbNote,
    ) -> Result<KbNote, BackendError> {
        let mut state = self.state.lock().await;
        let caller = state.caller(access_token)?;
        let entry_readable = state
            .entries
            .get(&note.entry_id)
            .is_some_and(|e| can_read_entry(e, caller));
        if !caller.is_some_and(|c| c.id == note.user_id) || !entry_readable {
            return Err(rls_violation("kb_notes"));
        }

        let now = Utc::now();
        let row = KbNote {
            id: Uuid::new_v4(),
            entry_id: note.entry_id,
            user_id: note.user_id,
            body: note.body.clone(),
            created_at: now,
            updated_at: now,
        };
        state.notes.insert(row.id, row.clone());
        Ok(row)
    }

    async fn delete_note(&self, access_token: Option<&str>, id: Uuid) -> Result<bool, BackendError> {
        let mut state = self.state.lock().await;
        let caller = state.caller(access_token)?;
        let deletable = state
            .notes
            .get(&id)
            .is_some_and(|n| can_access_note(n, caller));
        if deletable {
            state.notes.remove(&id);
        }
        Ok(deletable)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        Ok(())
    }
}
