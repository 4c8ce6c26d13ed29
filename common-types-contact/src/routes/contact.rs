use axum::{
    body::Bytes,
    extract::{
        Extension,
        State,
    },
    http::{
        StatusCode,
        header::ACCESS_CONTROL_MAX_AGE,
    },
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use common_types::Contact::{ContactPayload, RelaySuccess};

use crate::{
    Response::{ServerResponse, RelayError},
    State::AppState,
    Middleware::request_describer::RequestDescription,
    Discord::{self, WebhookMessage},
};

pub mod submission;
use submission::Submission;

pub const PREFLIGHT_MAX_AGE_SECS: &str = "86400";

// POST /contact API endpoint
// Body must be JSON, in format:
// {
//      name, email, subject, message,   [required]
//      latitude, longitude, locationType, locationError   [optional]
// }
//
// 1. Deserialize, a body that is not JSON is answered with 500
// 2. Check required fields, email shape and lengths, in that order
// 3. Sanitize every text field
// 4. Build the webhook message and POST it exactly once
//
// Responds with {success: true, message} if the webhook accepted the message
#[tracing::instrument(skip_all, fields(request="/contact", ip=?request_info.ip))]
pub async fn request(State(appstate): State<AppState>, Extension(request_info): Extension<RequestDescription>, body: Bytes) -> Result<Json<RelaySuccess>, ServerResponse> {
    tracing::info!("Received contact submission");
    let payload = serde_json::from_slice::<ContactPayload>(&body).map_err(|err| {
        tracing::warn!("Failed to parse request body, {err}");
        RelayError::MalformedBody(err.to_string())
    })?;

    let submission = Submission::try_from_payload(payload).map_err(|err| {
        tracing::info!("Validation failed with reason: {err}");
        err
    })?;

    let message = WebhookMessage::for_submission(&submission, request_info.ip, Utc::now());

    let Some(webhook_url) = appstate.webhook_url.as_deref() else {
        tracing::error!("DISCORD_WEBHOOK_URL not configured");
        return Err(RelayError::Configuration.into());
    };

    tracing::info!("Sending to Discord webhook");
    Discord::send(&appstate.http_client, webhook_url, &message).await.map_err(|err| {
        tracing::error!("Webhook delivery failed, {err}");
        RelayError::from(err)
    })?;

    tracing::info!("Message sent successfully");
    Ok(Json(RelaySuccess {
        success: true,
        message: "Message sent successfully".to_string(),
    }))
}

// OPTIONS /contact, the CORS layer adds the origin, method and header grants
#[tracing::instrument(fields(request="/contact"))]
pub async fn preflight() -> impl IntoResponse {
    [(ACCESS_CONTROL_MAX_AGE, PREFLIGHT_MAX_AGE_SECS)]
}

#[tracing::instrument(fields(request="/contact"))]
pub async fn method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}
