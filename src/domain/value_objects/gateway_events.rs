use serde::Deserialize;

/// Razorpay webhook envelope. `payload` carries the entities affected by the
/// event, each wrapped in an `entity` object.
/// https://razorpay.com/docs/webhooks/payloads/
#[derive(Debug, Deserialize)]
pub struct GatewayEvent {
    pub entity: Option<String>,
    pub event: String,
    pub created_at: Option<i64>,
    #[serde(default)]
    pub payload: GatewayEventPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct GatewayEventPayload {
    pub payment: Option<EntityWrapper<PaymentPayload>>,
    pub subscription: Option<EntityWrapper<SubscriptionPayload>>,
}

#[derive(Debug, Deserialize)]
pub struct EntityWrapper<T> {
    pub entity: T,
}

#[derive(Debug, Deserialize)]
pub struct PaymentPayload {
    pub id: String,
    pub amount: Option<i64>,
    pub status: Option<String>,
    pub error_description: Option<String>,
    pub subscription_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionPayload {
    pub id: String,
    pub status: Option<String>,
    pub customer_id: Option<String>,
}

impl GatewayEvent {
    pub fn payment(&self) -> Option<&PaymentPayload> {
        self.payload.payment.as_ref().map(|wrapper| &wrapper.entity)
    }

    pub fn subscription(&self) -> Option<&SubscriptionPayload> {
        self.payload
            .subscription
            .as_ref()
            .map(|wrapper| &wrapper.entity)
    }

    /// Gateway subscription id affected by this event, taken from the
    /// subscription entity when present, else from the payment entity.
    pub fn gateway_subscription_id(&self) -> Option<&str> {
        self.subscription()
            .map(|subscription| subscription.id.as_str())
            .or_else(|| {
                self.payment()
                    .and_then(|payment| payment.subscription_id.as_deref())
            })
    }

    /// External event id used for the webhook audit log. Razorpay does not
    /// put a top-level id on webhook envelopes, so the payment id stands in.
    pub fn external_ref(&self) -> Option<String> {
        self.payment().map(|payment| payment.id.clone())
    }
}
