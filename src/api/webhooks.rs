//! GitHub webhook ingestion.
//!
//! The signature is verified over the exact raw body bytes before those
//! same bytes are parsed as JSON; nothing is mutated until the
//! signature checks out. Only `issues` events are applied, all other
//! event types are acknowledged and skipped.

use crate::api::{internal_error, AppError, AppState};
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::post,
    Router,
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, info, warn};


type HmacSha256 = Hmac<Sha256>;

/// Signature header sent by GitHub
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// Event type header sent by GitHub
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Issue event payload (the fields this service consumes)
#[derive(Deserialize)]
struct IssuesEvent {
    issue: IssuePayload,
    repository: RepositoryPayload,
}

#[derive(Deserialize)]
struct IssuePayload {
    number: i64,
    title: String,
    state: String,
}

#[derive(Deserialize)]
struct RepositoryPayload {
    id: i64,
}

#[derive(Serialize)]
struct WebhookResponse {
    message: String,
    #[serde(rename = "issueId", skip_serializing_if = "Option::is_none")]
    issue_id: Option<String>,
}

/// Create the webhook API router
pub fn create_webhook_router(state: AppState) -> Router {
    Router::new()
        .route("/api/webhooks/github", post(receive_github_webhook))
        .with_state(state)
}

/// Verify a `sha256=<hex>` signature over the raw request body.
///
/// The digest comparison runs in constant time via the Mac
/// verification, so the check leaks no timing information about the
/// expected signature.
pub fn verify_signature(raw_body: &[u8], signature_header: &str, secret: &str) -> bool {
    let Some(hex_digest) = signature_header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };

    mac.update(raw_body);
    mac.verify_slice(&expected).is_ok()
}

/// POST /api/webhooks/github
async fn receive_github_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        return Err(AppError::Unauthorized(
            "Missing signature header".to_string(),
        ));
    };

    if !verify_signature(&body, signature, &state.config.webhook_secret) {
        warn!("Webhook signature verification failed");
        return Err(AppError::Unauthorized("Invalid signature".to_string()));
    }

    // Parse the verified bytes, never a re-serialized copy
    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|_| AppError::BadRequest("Invalid JSON payload".to_string()))?;

    let event_type = headers
        .get(EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    if event_type != "issues" {
        debug!(event = %event_type, "Skipping webhook event");
        return Ok(Json(WebhookResponse {
            message: format!(
                "Event type '{}' skipped (only 'issues' events are processed)",
                event_type
            ),
            issue_id: None,
        }));
    }

    let event: IssuesEvent = serde_json::from_value(payload)
        .map_err(|_| AppError::BadRequest("Invalid issues payload".to_string()))?;

    let project = state
        .db
        .find_project_by_repo(event.repository.id)
        .map_err(internal_error)?
        .ok_or_else(|| {
            warn!(
                repo = event.repository.id,
                "Webhook for unknown repository dropped"
            );
            AppError::NotFound("Project not found for this repository".to_string())
        })?;

    let result = state
        .db
        .upsert_issue(
            &project.id,
            event.issue.number,
            &event.issue.title,
            &event.issue.state,
        )
        .map_err(internal_error)?;

    info!(
        project = %project.id,
        issue = event.issue.number,
        created = result.created,
        "Webhook issue applied"
    );

    let message = if result.created {
        "Issue created successfully"
    } else {
        "Issue updated successfully"
    };

    Ok(Json(WebhookResponse {
        message: message.to_string(),
        issue_id: Some(result.issue.id),
    }))
}
