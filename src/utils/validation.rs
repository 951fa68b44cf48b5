//! Request validation with per-field error collection.
//!
//! Handlers run every rule for a request and then call [`Validator::finish`],
//! so clients see all problems at once in `error.details.fields`.

use crate::{
    error::ApiError,
    models::{
        AssistRequest, CreateKbEntryRequest, CreateKbNoteRequest, CredentialsRequest,
        EntryFilter, KbEntryPatch, KbEntryQuery, NewKbEntry, ResetChangeRequest,
        UpdateKbEntryRequest,
    },
    utils::sanitize::{canonicalize_url, sanitize_text},
};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use uuid::Uuid;

pub const EMAIL_MAX_LENGTH: usize = 254;
pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const PASSWORD_MAX_LENGTH: usize = 72;
pub const TITLE_MAX_LENGTH: usize = 200;
pub const URL_MAX_LENGTH: usize = 2048;
pub const TAG_MAX_LENGTH: usize = 32;
pub const MAX_TAGS: usize = 10;
pub const NOTE_MAX_LENGTH: usize = 5000;
pub const PROMPT_MAX_LENGTH: usize = 4000;
pub const CONTEXT_MAX_LENGTH: usize = 8000;
pub const SEARCH_MAX_LENGTH: usize = 200;
pub const DEFAULT_LIST_LIMIT: u32 = 20;
pub const MAX_LIST_LIMIT: u32 = 100;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").expect("tag pattern compiles"));

/// One failed rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Accumulates field errors for one request
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Require a present, trimmed string within `min..=max` characters
    pub fn required_text(
        &mut self,
        field: &str,
        value: Option<&str>,
        min: usize,
        max: usize,
    ) -> Option<String> {
        match value {
            None => {
                self.add(field, "is required");
                None
            }
            Some(raw) => self.text(field, raw, min, max),
        }
    }

    /// Validate an optional string; absent values pass
    pub fn optional_text(
        &mut self,
        field: &str,
        value: Option<&str>,
        min: usize,
        max: usize,
    ) -> Option<String> {
        value.and_then(|raw| self.text(field, raw, min, max))
    }

    fn text(&mut self, field: &str, raw: &str, min: usize, max: usize) -> Option<String> {
        let value = raw.trim();
        let len = value.chars().count();
        if len < min {
            if min == 1 {
                self.add(field, "must not be empty");
            } else {
                self.add(field, format!("must be at least {min} characters"));
            }
            None
        } else if len > max {
            self.add(field, format!("must be at most {max} characters"));
            None
        } else {
            Some(value.to_string())
        }
    }

    /// Require a syntactically plausible email address, lowercased
    pub fn email(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        let email = self.required_text(field, value, 1, EMAIL_MAX_LENGTH)?;
        if EMAIL_RE.is_match(&email) {
            Some(email.to_lowercase())
        } else {
            self.add(field, "must be a valid email address");
            None
        }
    }

    /// Require a password within the provider's length bounds; never trimmed
    pub fn password(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        let Some(password) = value else {
            self.add(field, "is required");
            return None;
        };
        let len = password.chars().count();
        if len < PASSWORD_MIN_LENGTH {
            self.add(field, format!("must be at least {PASSWORD_MIN_LENGTH} characters"));
            None
        } else if len > PASSWORD_MAX_LENGTH {
            self.add(field, format!("must be at most {PASSWORD_MAX_LENGTH} characters"));
            None
        } else {
            Some(password.to_string())
        }
    }

    /// Lowercase, trim and de-duplicate tags, keeping first-seen order
    pub fn tags(&mut self, field: &str, value: Option<&[String]>) -> Option<Vec<String>> {
        let raw = value?;
        if raw.len() > MAX_TAGS {
            self.add(field, format!("must contain at most {MAX_TAGS} tags"));
            return None;
        }

        let mut tags: Vec<String> = Vec::with_capacity(raw.len());
        for tag in raw {
            let tag = self.tag(field, tag)?;
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        Some(tags)
    }

    /// One tag, lowercased
    pub fn tag(&mut self, field: &str, raw: &str) -> Option<String> {
        let tag = raw.trim().to_lowercase();
        if tag.is_empty() || tag.chars().count() > TAG_MAX_LENGTH || !TAG_RE.is_match(&tag) {
            self.add(
                field,
                "tags must be 1-32 characters of a-z, 0-9 and '-', not starting with '-'",
            );
            return None;
        }
        Some(tag)
    }

    /// An http(s) URL; returns the trimmed original and its canonical form
    pub fn url(&mut self, field: &str, raw: &str) -> Option<(String, String)> {
        let url = raw.trim();
        if url.is_empty() {
            self.add(field, "must not be empty");
            return None;
        }
        if url.chars().count() > URL_MAX_LENGTH {
            self.add(field, format!("must be at most {URL_MAX_LENGTH} characters"));
            return None;
        }
        match canonicalize_url(url) {
            Ok(canonical) => Some((url.to_string(), canonical)),
            Err(e) => {
                self.add(field, e.to_string());
                None
            }
        }
    }

    /// Turn collected errors into a `VALIDATION_ERROR`
    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(self.into_error())
    }

    pub fn into_error(self) -> ApiError {
        ApiError::Validation {
            message: "Request validation failed".to_string(),
            details: Some(serde_json::json!({ "fields": self.errors })),
        }
    }
}

/// Validated sign-in / sign-up input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub fn validate_credentials(req: &CredentialsRequest) -> Result<Credentials, ApiError> {
    let mut v = Validator::new();
    let email = v.email("email", req.email.as_deref());
    let password = v.password("password", req.password.as_deref());
    match (email, password) {
        (Some(email), Some(password)) => Ok(Credentials { email, password }),
        _ => Err(v.into_error()),
    }
}

pub fn validate_email(value: Option<&str>) -> Result<String, ApiError> {
    let mut v = Validator::new();
    v.email("email", value).ok_or_else(|| v.into_error())
}

/// New password plus the optional recovery code
pub fn validate_password_change(
    req: &ResetChangeRequest,
) -> Result<(String, Option<String>), ApiError> {
    let mut v = Validator::new();
    let password = v.password("password", req.password.as_deref());
    let code = v.optional_text("code", req.code.as_deref().filter(|c| !c.trim().is_empty()), 1, 512);
    v.finish()?;
    match password {
        Some(password) => Ok((password, code)),
        None => Err(ApiError::validation("password is required")),
    }
}

pub fn validate_new_entry(user_id: Uuid, req: &CreateKbEntryRequest) -> Result<NewKbEntry, ApiError> {
    let mut v = Validator::new();
    let title = req.title.as_deref().map(sanitize_text);
    let title = v.required_text("title", title.as_deref(), 1, TITLE_MAX_LENGTH);
    let url = match req.url.as_deref() {
        Some(raw) => v.url("url", raw),
        None => {
            v.add("url", "is required");
            None
        }
    };
    let tags = v.tags("tags", req.tags.as_deref());

    match (title, url) {
        (Some(title), Some((url_original, url_canonical))) if v.is_valid() => Ok(NewKbEntry {
            user_id,
            title,
            url_original,
            url_canonical,
            tags: tags.unwrap_or_default(),
            is_public: req.is_public.unwrap_or(false),
        }),
        _ => Err(v.into_error()),
    }
}

/// Validate a partial update; at least one field must be present
pub fn validate_entry_patch(req: &UpdateKbEntryRequest) -> Result<KbEntryPatch, ApiError> {
    let mut v = Validator::new();
    if req.title.is_none() && req.url.is_none() && req.tags.is_none() && req.is_public.is_none() {
        v.add("body", "at least one field must be provided");
        return Err(v.into_error());
    }

    let title = req.title.as_deref().map(sanitize_text);
    let title = v.optional_text("title", title.as_deref(), 1, TITLE_MAX_LENGTH);
    let url = req.url.as_deref().and_then(|raw| v.url("url", raw));
    let tags = v.tags("tags", req.tags.as_deref());
    v.finish()?;

    let (url_original, url_canonical) = match url {
        Some((original, canonical)) => (Some(original), Some(canonical)),
        None => (None, None),
    };
    Ok(KbEntryPatch {
        title,
        url_original,
        url_canonical,
        tags,
        is_public: req.is_public,
    })
}

pub fn validate_entry_filter(query: &KbEntryQuery) -> Result<EntryFilter, ApiError> {
    let mut v = Validator::new();
    let limit = match query.limit {
        None => DEFAULT_LIST_LIMIT,
        Some(limit) if (1..=MAX_LIST_LIMIT).contains(&limit) => limit,
        Some(_) => {
            v.add("limit", format!("must be between 1 and {MAX_LIST_LIMIT}"));
            DEFAULT_LIST_LIMIT
        }
    };
    let search = query
        .q
        .as_deref()
        .map(sanitize_text)
        .filter(|q| !q.is_empty());
    let search = v.optional_text("q", search.as_deref(), 1, SEARCH_MAX_LENGTH);
    let tag = query
        .tag
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .and_then(|t| v.tag("tag", t));
    v.finish()?;

    Ok(EntryFilter {
        limit,
        offset: query.offset.unwrap_or(0),
        search,
        tag,
    })
}

pub fn validate_note(req: &CreateKbNoteRequest) -> Result<String, ApiError> {
    let mut v = Validator::new();
    v.required_text("body", req.body.as_deref(), 1, NOTE_MAX_LENGTH)
        .ok_or_else(|| v.into_error())
}

/// Prompt and optional context for the AI assistant
pub fn validate_assist(req: &AssistRequest) -> Result<(String, Option<String>), ApiError> {
    let mut v = Validator::new();
    let prompt = v.required_text("prompt", req.prompt.as_deref(), 1, PROMPT_MAX_LENGTH);
    let context = req.context.as_deref().filter(|c| !c.trim().is_empty());
    let context = v.optional_text("context", context, 1, CONTEXT_MAX_LENGTH);
    match prompt {
        Some(prompt) if v.is_valid() => Ok((prompt, context)),
        _ => Err(v.into_error()),
    }
}

/// Parse a path identifier as a UUID
pub fn parse_uuid(field: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::Validation {
        message: "Request validation failed".to_string(),
        details: Some(serde_json::json!({
            "fields": [FieldError { field: field.to_string(), message: "must be a valid UUID".to_string() }]
        })),
    })
}
