//! Stripe webhook handler

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use fanvault_billing_core::BillingError;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: &'static str,
}

/// POST /webhooks/stripe
///
/// Rejected deliveries answer 400 and are not retried by the sender;
/// failures worth retrying answer 500.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    let Some(sig_header) = headers.get("stripe-signature") else {
        tracing::warn!("Missing Stripe-Signature header");
        return Err(BillingError::InvalidSignature("missing Stripe-Signature header".into()).into());
    };

    let signature = sig_header.to_str().map_err(|_| {
        tracing::warn!("Invalid Stripe-Signature header encoding");
        BillingError::InvalidSignature("invalid header encoding".into())
    })?;

    let outcome = state.billing.handle_webhook(&body, signature).await?;

    Ok(Json(WebhookAck {
        received: true,
        outcome: outcome.as_str(),
    }))
}
