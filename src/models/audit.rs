//! Audit logging data structures for authentication flows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Types of authentication events for audit logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventType {
    SignIn,
    SignUp,
    SignOut,
    PasswordResetRequested,
    PasswordChanged,
    EmailChangeRequested,
    SessionRefreshed,
}

/// Outcomes of authentication events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventOutcome {
    Success,
    Failure,
}

/// Structured audit log entry for authentication events
///
/// The email is recorded as entered; passwords and tokens never are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthAuditEvent {
    pub event_type: AuthEventType,
    pub outcome: AuthEventOutcome,
    pub timestamp: DateTime<Utc>,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub endpoint: String,
    pub request_id: Option<String>,
    pub reason: Option<String>,
}

impl AuthAuditEvent {
    pub fn new(
        event_type: AuthEventType,
        outcome: AuthEventOutcome,
        ip_address: String,
        endpoint: String,
    ) -> Self {
        Self {
            event_type,
            outcome,
            timestamp: Utc::now(),
            ip_address,
            user_agent: None,
            user_id: None,
            email: None,
            endpoint,
            request_id: None,
            reason: None,
        }
    }

    /// Start an event from the request's client details
    pub fn from_request(
        req: &actix_web::HttpRequest,
        event_type: AuthEventType,
        outcome: AuthEventOutcome,
    ) -> Self {
        use actix_web::HttpMessage;

        let request_id = req.extensions().get::<crate::middleware::RequestId>().map(|id| id.0.clone());
        Self::new(
            event_type,
            outcome,
            crate::utils::http::extract_client_ip(req),
            req.path().to_string(),
        )
        .with_user_agent(crate::utils::http::extract_user_agent(req))
        .with_request_id(request_id)
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    /// Internal failure reason; logged only, never sent to the client
    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    /// Log the audit event using structured logging
    pub fn log(&self) {
        info!(
            target: "auth_audit",
            event_type = ?self.event_type,
            outcome = ?self.outcome,
            timestamp = %self.timestamp,
            ip_address = %self.ip_address,
            user_agent = ?self.user_agent,
            user_id = ?self.user_id,
            email = ?self.email,
            endpoint = %self.endpoint,
            request_id = ?self.request_id,
            reason = ?self.reason,
            "Authentication audit event"
        );
    }
}
