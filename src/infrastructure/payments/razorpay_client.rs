use anyhow::Result;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::error;

use crate::domain::entities::subscriptions::SubscriptionEntity;

type HmacSha256 = Hmac<Sha256>;

/// Outcome of a charge attempt. A decline is data, not an error: it feeds the
/// retry policy rather than aborting the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ChargeOutcome {
    Captured { gateway_payment_id: String },
    Declined { reason: String },
}

/// Minimal Razorpay client built on reqwest.
pub struct RazorpayClient {
    http: reqwest::Client,
    key_id: String,
    key_secret: String,
    webhook_secret: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorEnvelope {
    error: RazorpayErrorDetails,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorDetails {
    code: Option<String>,
    description: Option<String>,
    source: Option<String>,
    step: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecurringChargeResponse {
    razorpay_payment_id: String,
}

impl RazorpayClient {
    pub fn new(
        key_id: String,
        key_secret: String,
        webhook_secret: String,
        currency: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            key_id,
            key_secret,
            webhook_secret,
            currency,
        }
    }

    /// Charges the next billing cycle against the customer's saved mandate.
    /// https://razorpay.com/docs/payments/recurring-payments/
    pub async fn charge_recurring(
        &self,
        subscription: &SubscriptionEntity,
    ) -> Result<ChargeOutcome> {
        let customer_id = subscription
            .gateway_customer_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("subscription has no gateway customer id"))?;

        let body = [
            ("amount", subscription.recurring_price_minor.to_string()),
            ("currency", self.currency.clone()),
            ("customer_id", customer_id.to_string()),
            ("recurring", "1".to_string()),
            (
                "description",
                format!("subscription renewal {}", subscription.id),
            ),
            ("notes[subscription_id]", subscription.id.to_string()),
        ];

        let resp = self
            .http
            .post("https://api.razorpay.com/v1/payments/create/recurring")
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .form(&body)
            .send()
            .await?;

        if resp.status().is_success() {
            let parsed: RecurringChargeResponse = resp.json().await?;
            return Ok(ChargeOutcome::Captured {
                gateway_payment_id: parsed.razorpay_payment_id,
            });
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let details = serde_json::from_str::<RazorpayErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        if status.is_client_error() {
            // The gateway looked at the charge and refused it.
            let reason = details
                .as_ref()
                .and_then(|details| details.description.clone())
                .unwrap_or_else(|| format!("charge declined with status {}", status));
            return Ok(ChargeOutcome::Declined { reason });
        }

        error!(
            status = %status,
            subscription_id = %subscription.id,
            gateway_error_code = ?details.as_ref().and_then(|d| d.code.clone()),
            gateway_error_source = ?details.as_ref().and_then(|d| d.source.clone()),
            gateway_error_step = ?details.as_ref().and_then(|d| d.step.clone()),
            gateway_error_reason = ?details.as_ref().and_then(|d| d.reason.clone()),
            response_body = %body,
            "razorpay api request failed"
        );

        anyhow::bail!(
            "Razorpay recurring charge failed for subscription {} (status {})",
            subscription.id,
            status
        );
    }

    /// Verifies the webhook signature header against the raw body.
    /// https://razorpay.com/docs/webhooks/validate-test/
    pub fn verify_webhook_signature(&self, payload: &[u8], signature_header: &str) -> Result<()> {
        let provided = hex::decode(signature_header.trim())?;

        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())?;
        mac.update(payload);

        // verify_slice is constant-time; a plain byte compare would leak
        // prefix-match timing to the sender.
        mac.verify_slice(&provided)
            .map_err(|_| anyhow::anyhow!("invalid webhook signature"))
    }
}
