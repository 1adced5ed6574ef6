//! Inbound chat provider webhook.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use domain::services::WebhookOutcome;
use domain::MeetupStore;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_chat_webhook;
use crate::middleware::RequestId;

/// Header carrying the hex HMAC-SHA256 of the raw body.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Provider delivery id, logged for correlation.
pub const WEBHOOK_ID_HEADER: &str = "x-webhook-id";

/// Receives a chat provider event.
///
/// POST /api/v1/webhooks/chat
///
/// The signature is checked against the raw bytes before anything is parsed.
pub async fn receive_chat_event<S: MeetupStore>(
    State(state): State<AppState<S>>,
    request_id: Option<Extension<RequestId>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookOutcome>), ApiError> {
    let webhook_id = headers
        .get(WEBHOOK_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none");
    let request_id = request_id.map(|Extension(r)| r.0).unwrap_or_default();

    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        record_chat_webhook("unsigned");
        tracing::warn!(request_id = %request_id, webhook_id = %webhook_id, "Chat webhook without signature");
        return Err(ApiError::Unauthorized("Missing webhook signature".to_string()));
    };

    match state.core.handle_chat_webhook(&body, signature).await {
        Ok(outcome) => {
            record_chat_webhook(match outcome {
                WebhookOutcome::Notified { .. } => "notified",
                WebhookOutcome::Ignored => "ignored",
            });
            tracing::debug!(
                request_id = %request_id,
                webhook_id = %webhook_id,
                outcome = ?outcome,
                "Chat webhook handled"
            );
            Ok((StatusCode::OK, Json(outcome)))
        }
        Err(e) => {
            record_chat_webhook("rejected");
            tracing::warn!(
                request_id = %request_id,
                webhook_id = %webhook_id,
                error = %e,
                "Chat webhook rejected"
            );
            Err(e.into())
        }
    }
}
