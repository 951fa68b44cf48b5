//! AI-assist request/response models.

use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};

/// Request model for the AI assist endpoint
#[derive(Debug, Default, Serialize, Deserialize, Apiv2Schema)]
pub struct AssistRequest {
    pub prompt: Option<String>,
    /// Extra material (a bug report, a test charter, ...) for the prompt
    pub context: Option<String>,
}

/// Per-user usage for the current UTC day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub requests_today: u32,
    pub tokens_today: u64,
    pub daily_limit: u32,
}

/// Response model for a completed assist call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistResponse {
    pub reply: String,
    pub model: String,
    pub usage: UsageSnapshot,
}
