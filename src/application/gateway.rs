use anyhow::Result as AnyResult;
use async_trait::async_trait;

use crate::domain::entities::subscriptions::SubscriptionEntity;
use crate::infrastructure::payments::razorpay_client::{ChargeOutcome, RazorpayClient};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, subscription: &SubscriptionEntity) -> AnyResult<ChargeOutcome>;

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<()>;
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn charge(&self, subscription: &SubscriptionEntity) -> AnyResult<ChargeOutcome> {
        self.charge_recurring(subscription).await
    }

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<()> {
        self.verify_webhook_signature(payload, signature)
    }
}
