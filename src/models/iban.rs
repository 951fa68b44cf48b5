//! IBAN generator and validator request/response models.

use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};

/// Query parameters for the IBAN generator
#[derive(Debug, Default, Serialize, Deserialize, Apiv2Schema)]
pub struct IbanGenerateQuery {
    /// Country code, one of DE, AT, PL
    pub country: Option<String>,
    /// Optional seed; the same seed always yields the same IBAN
    pub seed: Option<String>,
    /// `json` (default) or `text`
    pub format: Option<String>,
}

/// Query parameters (GET) or body (POST) for the IBAN validator
#[derive(Debug, Default, Serialize, Deserialize, Apiv2Schema)]
pub struct IbanValidateRequest {
    pub iban: Option<String>,
}

/// Response model for a generated IBAN
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedIban {
    pub iban: String,
    pub formatted: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
}

/// Response model for IBAN validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IbanValidationResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
}
