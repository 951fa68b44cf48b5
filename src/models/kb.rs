//! Knowledge-base entries and notes.

use chrono::{DateTime, Utc};
use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Columns selected for entries; the backend-managed `search_vector` is never read
pub const KB_ENTRY_COLUMNS: &str =
    "id,user_id,title,url_original,url_canonical,tags,is_public,created_at,updated_at";

pub const KB_NOTE_COLUMNS: &str = "id,entry_id,user_id,body,created_at,updated_at";

/// Row of the `kb_entries` table as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub url_original: String,
    pub url_canonical: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request model for creating an entry
#[derive(Debug, Default, Serialize, Deserialize, Apiv2Schema)]
pub struct CreateKbEntryRequest {
    pub title: Option<String>,
    pub url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

/// Request model for updating an entry; every field is optional
#[derive(Debug, Default, Serialize, Deserialize, Apiv2Schema)]
pub struct UpdateKbEntryRequest {
    pub title: Option<String>,
    pub url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

/// Validated insert payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewKbEntry {
    pub user_id: Uuid,
    pub title: String,
    pub url_original: String,
    pub url_canonical: String,
    pub tags: Vec<String>,
    pub is_public: bool,
}

/// Validated update payload; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KbEntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_original: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_canonical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

/// Query parameters for listing entries
#[derive(Debug, Default, Serialize, Deserialize, Apiv2Schema)]
pub struct KbEntryQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Full-text search over title and URL
    pub q: Option<String>,
    /// Only entries carrying this tag
    pub tag: Option<String>,
}

/// Validated list filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFilter {
    pub limit: u32,
    pub offset: u32,
    pub search: Option<String>,
    pub tag: Option<String>,
}

impl Default for EntryFilter {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
            search: None,
            tag: None,
        }
    }
}

/// Row of the `kb_notes` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbNote {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request model for attaching a note to an entry
#[derive(Debug, Default, Serialize, Deserialize, Apiv2Schema)]
pub struct CreateKbNoteRequest {
    pub body: Option<String>,
}

/// Validated note insert payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewKbNote {
    pub entry_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
}
