//! AI assist endpoints.

use crate::{
    backend::RequestClient,
    error::ApiError,
    models::{AssistRequest, AssistResponse, Envelope},
    services::{AiAssistant, AppMetrics, UsageTracker},
    utils::validate_assist,
};
use actix_web::{Error, HttpRequest, HttpResponse, Result, web};
use paperclip::actix::api_v2_operation;
use tracing::{info, warn};

fn record(req: &HttpRequest, outcome: &str) {
    if let Some(metrics) = req.app_data::<web::Data<AppMetrics>>() {
        metrics.record_ai_invocation(outcome);
    }
}

fn usage_tracker(req: &HttpRequest) -> Result<web::Data<UsageTracker>, ApiError> {
    req.app_data::<web::Data<UsageTracker>>()
        .cloned()
        .ok_or_else(|| ApiError::Configuration("usage tracker is not configured".to_string()))
}

/// Ask the assistant for testing help
#[api_v2_operation(
    summary = "AI Assist",
    description = "Sends a prompt, with optional context, to the configured language model. Each user has a daily request limit that resets at UTC midnight.",
    tags("AI"),
    responses(
        (status = 200, description = "Assistant reply with today's usage"),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 429, description = "Daily limit reached"),
        (status = 500, description = "AI service not configured or unavailable")
    )
)]
pub async fn assist(
    req: HttpRequest,
    payload: web::Json<AssistRequest>,
) -> Result<HttpResponse, Error> {
    let client = RequestClient::from_request(&req)?;
    let user = client.require_user()?;
    let (prompt, context) = validate_assist(&payload)?;

    let assistant = req
        .app_data::<web::Data<AiAssistant>>()
        .cloned()
        .ok_or_else(|| ApiError::Configuration("AI assistant is not configured".to_string()))?;
    let tracker = usage_tracker(&req)?;

    if let Err(retry_after) = tracker.try_begin(user.id).await {
        warn!(user_id = %user.id, retry_after = retry_after, "AI daily limit reached");
        record(&req, "limited");
        return Err(ApiError::RateLimited {
            code: "AI_DAILY_LIMIT_EXCEEDED",
            retry_after,
        }
        .into());
    }

    let completion = match assistant.assist(&prompt, context.as_deref()).await {
        Ok(completion) => completion,
        Err(e) => {
            tracker.release(user.id).await;
            record(&req, "error");
            return Err(ApiError::from(e).into());
        }
    };

    let usage = tracker.record_tokens(user.id, completion.tokens).await;
    record(&req, "success");
    info!(
        user_id = %user.id,
        model = %completion.model,
        tokens = completion.tokens,
        requests_today = usage.requests_today,
        "AI assist completed"
    );

    Ok(Envelope::ok(AssistResponse {
        reply: completion.reply,
        model: completion.model,
        usage,
    }))
}

/// Today's AI usage for the caller
#[api_v2_operation(
    summary = "AI Usage",
    description = "Returns the caller's AI requests and tokens for the current UTC day.",
    tags("AI"),
    responses(
        (status = 200, description = "Usage snapshot"),
        (status = 401, description = "Authentication required")
    )
)]
pub async fn usage(req: HttpRequest) -> Result<HttpResponse, Error> {
    let client = RequestClient::from_request(&req)?;
    let user = client.require_user()?;
    let tracker = usage_tracker(&req)?;
    Ok(Envelope::ok(tracker.snapshot(user.id).await))
}
