//! Response envelope and standard endpoint models.

use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};

/// Success envelope: every JSON success body is `{"data": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }

    /// 200 OK with the enveloped body
    pub fn ok(data: T) -> HttpResponse {
        HttpResponse::Ok().json(Self::new(data))
    }

    /// 201 Created with the enveloped body
    pub fn created(data: T) -> HttpResponse {
        HttpResponse::Created().json(Self::new(data))
    }
}

/// Response model for the health check endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub backend: String,
    pub version: String,
    pub commit: String,
    pub timestamp: String,
}
