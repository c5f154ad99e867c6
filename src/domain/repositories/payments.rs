use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::payments::{InsertPaymentEntity, PaymentEntity};

#[automock]
#[async_trait]
pub trait PaymentRepository {
    async fn record_payment(&self, insert_payment: InsertPaymentEntity) -> Result<Uuid>;

    async fn find_by_gateway_payment_id(
        &self,
        gateway_payment_id: &str,
    ) -> Result<Option<PaymentEntity>>;

    async fn list_by_subscription(&self, subscription_id: Uuid) -> Result<Vec<PaymentEntity>>;
}
