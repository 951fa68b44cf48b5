//! Supabase backend: GoTrue for accounts and sessions, PostgREST for rows.

use super::{Backend, BackendError};
use crate::{
    config::{BackendConfig, ConfigError},
    models::{
        AuthSession, AuthUser, EntryFilter, KB_ENTRY_COLUMNS, KB_NOTE_COLUMNS, KbEntry,
        KbEntryPatch, KbNote, NewKbEntry, NewKbNote, Profile, SignUpOutcome,
    },
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::time::Duration;
use uuid::Uuid;

const PROFILE_COLUMNS: &str = "id,email,role,created_at,updated_at";

/// PostgREST error body
#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
}

/// GoTrue reports errors under several field names depending on the endpoint
#[derive(Debug, Default, Deserialize)]
struct GoTrueError {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl GoTrueError {
    fn into_message(self) -> String {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

/// HTTP client for a hosted Supabase project
pub struct SupabaseBackend {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, ConfigError> {
        let base_url = config
            .url
            .as_deref()
            .ok_or(ConfigError::Missing("SUPABASE_URL"))?
            .trim_end_matches('/')
            .to_string();
        let anon_key = config
            .anon_key
            .clone()
            .ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ConfigError::Invalid {
                name: "BACKEND_TIMEOUT_SECONDS",
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url,
            anon_key,
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Request carrying the project key and the caller's token (or the anon key)
    fn request(&self, method: Method, url: String, access_token: Option<&str>) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token.unwrap_or(&self.anon_key))
    }

    async fn send_auth<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, BackendError> {
        let response = builder.send().await?;
        if response.status().is_success() {
            return Ok(response.json().await?);
        }
        Err(auth_error(response).await)
    }

    async fn send_auth_empty(&self, builder: RequestBuilder) -> Result<(), BackendError> {
        let response = builder.send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(auth_error(response).await)
    }

    async fn send_rest<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, BackendError> {
        let response = builder.send().await?;
        if response.status().is_success() {
            return Ok(response.json().await?);
        }
        Err(rest_error(response).await)
    }

    /// Write returning the affected rows
    fn rest_write(
        &self,
        method: Method,
        table: &str,
        access_token: Option<&str>,
    ) -> RequestBuilder {
        self.request(method, self.rest_url(table), access_token)
            .header("Prefer", "return=representation")
    }
}

async fn auth_error(response: Response) -> BackendError {
    let status = response.status();
    let message = response
        .json::<GoTrueError>()
        .await
        .unwrap_or_default()
        .into_message();

    if status == StatusCode::UNAUTHORIZED {
        BackendError::Unauthorized(message)
    } else if status.is_server_error() {
        BackendError::Transport(format!("auth provider returned {status}: {message}"))
    } else {
        BackendError::Auth {
            status: status.as_u16(),
            message,
        }
    }
}

async fn rest_error(response: Response) -> BackendError {
    let status = response.status();
    let body = response.json::<PostgrestError>().await.unwrap_or_default();
    let code = body.code.unwrap_or_default();
    let message = body.message.unwrap_or_else(|| status.to_string());

    match code.as_str() {
        "PGRST116" => BackendError::NotFound,
        "42501" => BackendError::PermissionDenied(message),
        "PGRST301" | "PGRST302" => BackendError::Unauthorized(message),
        _ if status == StatusCode::UNAUTHORIZED => BackendError::Unauthorized(message),
        _ if status == StatusCode::FORBIDDEN => BackendError::PermissionDenied(message),
        _ => BackendError::Database { code, message },
    }
}

/// Sign-up answers with a session when auto-confirm is on, otherwise with the bare user
fn parse_sign_up(body: Value) -> Result<SignUpOutcome, BackendError> {
    if body.get("access_token").is_some() {
        let session: AuthSession =
            serde_json::from_value(body).map_err(|e| BackendError::Decode(e.to_string()))?;
        return Ok(SignUpOutcome::SignedIn(session));
    }

    let user = body.get("user").cloned().unwrap_or(body);
    let user: AuthUser =
        serde_json::from_value(user).map_err(|e| BackendError::Decode(e.to_string()))?;
    Ok(SignUpOutcome::ConfirmationRequired(user))
}

fn id_filter(id: Uuid) -> String {
    format!("eq.{id}")
}

#[async_trait]
impl Backend for SupabaseBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let builder = self
            .request(Method::POST, self.auth_url("token"), None)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        self.send_auth(builder).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpOutcome, BackendError> {
        let mut builder = self
            .request(Method::POST, self.auth_url("signup"), None)
            .json(&json!({ "email": email, "password": password }));
        if let Some(redirect) = redirect_to {
            builder = builder.query(&[("redirect_to", redirect)]);
        }
        let body: Value = self.send_auth(builder).await?;
        parse_sign_up(body)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let builder = self.request(Method::POST, self.auth_url("logout"), Some(access_token));
        self.send_auth_empty(builder).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        let builder = self
            .request(Method::POST, self.auth_url("token"), None)
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }));
        self.send_auth(builder).await
    }

    async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), BackendError> {
        let mut builder = self
            .request(Method::POST, self.auth_url("recover"), None)
            .json(&json!({ "email": email }));
        if let Some(redirect) = redirect_to {
            builder = builder.query(&[("redirect_to", redirect)]);
        }
        self.send_auth_empty(builder).await
    }

    async fn verify_recovery(&self, code: &str) -> Result<AuthSession, BackendError> {
        let builder = self
            .request(Method::POST, self.auth_url("verify"), None)
            .json(&json!({ "type": "recovery", "token_hash": code }));
        self.send_auth(builder).await
    }

    async fn update_password(
        &self,
        access_token: &str,
        password: &str,
    ) -> Result<(), BackendError> {
        let builder = self
            .request(Method::PUT, self.auth_url("user"), Some(access_token))
            .json(&json!({ "password": password }));
        self.send_auth_empty(builder).await
    }

    async fn update_email(&self, access_token: &str, email: &str) -> Result<AuthUser, BackendError> {
        let builder = self
            .request(Method::PUT, self.auth_url("user"), Some(access_token))
            .json(&json!({ "email": email }));
        self.send_auth(builder).await
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let builder = self.request(Method::GET, self.auth_url("user"), Some(access_token));
        self.send_auth(builder).await
    }

    async fn fetch_profile(
        &self,
        access_token: Option<&str>,
        user_id: Uuid,
    ) -> Result<Option<Profile>, BackendError> {
        let builder = self
            .request(Method::GET, self.rest_url("profiles"), access_token)
            .query(&[("select", PROFILE_COLUMNS), ("id", id_filter(user_id).as_str())]);
        let rows: Vec<Profile> = self.send_rest(builder).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_entries(
        &self,
        access_token: Option<&str>,
        filter: &EntryFilter,
    ) -> Result<Vec<KbEntry>, BackendError> {
        let mut params = vec![
            ("select", KB_ENTRY_COLUMNS.to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", filter.limit.to_string()),
            ("offset", filter.offset.to_string()),
        ];
        if let Some(search) = &filter.search {
            params.push(("search_vector", format!("plfts.{search}")));
        }
        if let Some(tag) = &filter.tag {
            params.push(("tags", format!("cs.{{{tag}}}")));
        }

        let builder = self
            .request(Method::GET, self.rest_url("kb_entries"), access_token)
            .query(&params);
        self.send_rest(builder).await
    }

    async fn get_entry(
        &self,
        access_token: Option<&str>,
        id: Uuid,
    ) -> Result<Option<KbEntry>, BackendError> {
        let builder = self
            .request(Method::GET, self.rest_url("kb_entries"), access_token)
            .query(&[("select", KB_ENTRY_COLUMNS), ("id", id_filter(id).as_str())]);
        let rows: Vec<KbEntry> = self.send_rest(builder).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_entry(
        &self,
        access_token: Option<&str>,
        entry: &NewKbEntry,
    ) -> Result<KbEntry, BackendError> {
        let builder = self
            .rest_write(Method::POST, "kb_entries", access_token)
            .query(&[("select", KB_ENTRY_COLUMNS)])
            .json(entry);
        let rows: Vec<KbEntry> = self.send_rest(builder).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("insert returned no row".to_string()))
    }

    async fn update_entry(
        &self,
        access_token: Option<&str>,
        id: Uuid,
        patch: &KbEntryPatch,
    ) -> Result<Option<KbEntry>, BackendError> {
        let builder = self
            .rest_write(Method::PATCH, "kb_entries", access_token)
            .query(&[("select", KB_ENTRY_COLUMNS), ("id", id_filter(id).as_str())])
            .json(patch);
        let rows: Vec<KbEntry> = self.send_rest(builder).await?;
        Ok(rows.into_iter().next())
    }

    async fn delete_entry(&self, access_token: Option<&str>, id: Uuid) -> Result<bool, BackendError> {
        let builder = self
            .rest_write(Method::DELETE, "kb_entries", access_token)
            .query(&[("select", "id"), ("id", id_filter(id).as_str())]);
        let rows: Vec<Value> = self.send_rest(builder).await?;
        Ok(!rows.is_empty())
    }

    async fn list_notes(
        &self,
        access_token: Option<&str>,
        entry_id: Uuid,
    ) -> Result<Vec<KbNote>, BackendError> {
        let builder = self
            .request(Method::GET, self.rest_url("kb_notes"), access_token)
            .query(&[
                ("select", KB_NOTE_COLUMNS),
                ("entry_id", id_filter(entry_id).as_str()),
                ("order", "created_at.asc"),
            ]);
        self.send_rest(builder).await
    }

    async fn insert_note(
        &self,
        access_token: Option<&str>,
        note: &NewKbNote,
    ) -> Result<KbNote, BackendError> {
        let builder = self
            .rest_write(Method::POST, "kb_notes", access_token)
            .query(&[("select", KB_NOTE_COLUMNS)])
            .json(note);
        let rows: Vec<KbNote> = self.send_rest(builder).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("insert returned no row".to_string()))
    }

    async fn delete_note(&self, access_token: Option<&str>, id: Uuid) -> Result<bool, BackendError> {
        let builder = self
            .rest_write(Method::DELETE, "kb_notes", access_token)
            .query(&[("select", "id"), ("id", id_filter(id).as_str())]);
        let rows: Vec<Value> = self.send_rest(builder).await?;
        Ok(!rows.is_empty())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let response = self
            .request(Method::GET, self.auth_url("health"), None)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(BackendError::Transport(format!(
                "health probe returned {}",
                response.status()
            )))
        }
    }
}
