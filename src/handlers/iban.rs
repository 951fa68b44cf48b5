//! IBAN generator and validator endpoints.

use crate::{
    error::ApiError,
    models::{Envelope, GeneratedIban, IbanGenerateQuery, IbanValidateRequest, IbanValidationResponse},
    services::{
        enforce_rate_limit,
        iban::{GENERATOR_COUNTRIES, format_iban, generate_iban, validate_iban},
    },
};
use actix_web::{Error, HttpRequest, HttpResponse, Result, web};
use paperclip::actix::api_v2_operation;

const DEFAULT_COUNTRY: &str = "DE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Text,
}

fn parse_format(raw: Option<&str>) -> Result<OutputFormat, ApiError> {
    match raw.map(|f| f.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("json") => Ok(OutputFormat::Json),
        Some("text") => Ok(OutputFormat::Text),
        Some(_) => Err(ApiError::validation("format must be 'json' or 'text'")),
    }
}

/// Generate a valid IBAN
#[api_v2_operation(
    summary = "Generate IBAN",
    description = "Generates a checksum-valid IBAN for DE, AT or PL. The same seed always produces the same IBAN. `format=text` returns the plain IBAN.",
    tags("Generators"),
    responses(
        (status = 200, description = "Generated IBAN"),
        (status = 400, description = "Unsupported country or format"),
        (status = 429, description = "Too many requests")
    )
)]
pub async fn generate(
    req: HttpRequest,
    query: web::Query<IbanGenerateQuery>,
) -> Result<HttpResponse, Error> {
    enforce_rate_limit(&req, "iban_generate").await?;

    let format = parse_format(query.format.as_deref())?;
    let country = query
        .country
        .as_deref()
        .map(|c| c.trim().to_ascii_uppercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());
    let seed = query.seed.as_deref();

    let iban = generate_iban(&country, seed).map_err(|e| {
        let supported: Vec<&str> = GENERATOR_COUNTRIES.iter().map(|c| c.code).collect();
        ApiError::Validation {
            message: e.to_string(),
            details: Some(serde_json::json!({ "supported_countries": supported })),
        }
    })?;

    Ok(match format {
        OutputFormat::Text => HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .body(iban),
        OutputFormat::Json => Envelope::ok(GeneratedIban {
            formatted: format_iban(&iban),
            iban,
            country,
            seed: seed.map(str::to_string),
        }),
    })
}

fn validation_response(raw: Option<&str>) -> Result<IbanValidationResponse, ApiError> {
    let raw = raw
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ApiError::validation("iban is required"))?;
    let result = validate_iban(raw);

    Ok(if result.valid {
        IbanValidationResponse {
            valid: true,
            reason: None,
            country: result.normalized.get(..2).map(str::to_string),
            formatted: Some(format_iban(&result.normalized)),
        }
    } else {
        IbanValidationResponse {
            valid: false,
            reason: result.reason.map(|r| r.message().to_string()),
            country: None,
            formatted: None,
        }
    })
}

/// Validate an IBAN passed as a query parameter
#[api_v2_operation(
    summary = "Validate IBAN",
    description = "Checks the structure, the country length and the mod-97 checksum of an IBAN.",
    tags("Validators"),
    responses(
        (status = 200, description = "Validation result"),
        (status = 400, description = "Missing iban"),
        (status = 429, description = "Too many requests")
    )
)]
pub async fn validate_get(
    req: HttpRequest,
    query: web::Query<IbanValidateRequest>,
) -> Result<HttpResponse, Error> {
    enforce_rate_limit(&req, "iban_validate").await?;
    Ok(Envelope::ok(validation_response(query.iban.as_deref())?))
}

/// Validate an IBAN passed in a JSON body
#[api_v2_operation(
    summary = "Validate IBAN (POST)",
    description = "Same as the GET variant with the IBAN in the request body.",
    tags("Validators"),
    responses(
        (status = 200, description = "Validation result"),
        (status = 400, description = "Missing iban"),
        (status = 429, description = "Too many requests")
    )
)]
pub async fn validate_post(
    req: HttpRequest,
    payload: web::Json<IbanValidateRequest>,
) -> Result<HttpResponse, Error> {
    enforce_rate_limit(&req, "iban_validate").await?;
    Ok(Envelope::ok(validation_response(payload.iban.as_deref())?))
}
