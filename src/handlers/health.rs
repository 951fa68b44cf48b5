//! Health check endpoint handler.

use crate::{
    backend::SharedBackend,
    models::{Envelope, HealthResponse},
    services::{APP_VERSION, build_commit},
};
use actix_web::{Error, HttpRequest, HttpResponse, Result, web};
use chrono::{SecondsFormat, Utc};
use paperclip::actix::api_v2_operation;

/// Health check endpoint
///
/// Always answers 200 so that load balancers can tell the process is up;
/// backend reachability is reported in the body.
#[api_v2_operation(
    summary = "Health Check Endpoint",
    description = "Returns the service status, backend reachability and build information.",
    tags("Health"),
    responses((status = 200, description = "Successful response"))
)]
pub async fn health(req: HttpRequest) -> Result<HttpResponse, Error> {
    let backend_status = match req.app_data::<web::Data<SharedBackend>>() {
        Some(backend) => match backend.ping().await {
            Ok(()) => "ok",
            Err(e) => {
                tracing::warn!(error = %e, "Backend health probe failed");
                "unavailable"
            }
        },
        None => "unavailable",
    };

    Ok(Envelope::ok(HealthResponse {
        status: "healthy".to_string(),
        backend: backend_status.to_string(),
        version: APP_VERSION.to_string(),
        commit: build_commit().to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}
