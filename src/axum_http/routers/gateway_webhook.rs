use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use tracing::warn;

use crate::application::usecases::gateway_webhook::{GatewayWebhookUseCase, WebhookError};
use crate::axum_http::error_responses::ErrorResponse;

pub const SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

pub fn routes(webhook_usecase: Arc<GatewayWebhookUseCase>) -> Router {
    Router::new()
        .route("/razorpay", post(handle_gateway_webhook))
        .with_state(webhook_usecase)
}

pub async fn handle_gateway_webhook(
    State(webhook_usecase): State<Arc<GatewayWebhookUseCase>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    match webhook_usecase.handle_event(&body, signature).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => {
            let status = err.status_code();
            let message = match &err {
                WebhookError::Internal(_) => "Internal server error".to_string(),
                other => other.to_string(),
            };
            warn!(status = status.as_u16(), error = %err, "webhook request rejected");
            (
                status,
                Json(ErrorResponse {
                    code: status.as_u16(),
                    message,
                }),
            )
                .into_response()
        }
    }
}
