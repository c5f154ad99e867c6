use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::webhook_logs::InsertWebhookLogEntity;

#[automock]
#[async_trait]
pub trait WebhookLogRepository {
    async fn insert(&self, insert_log: InsertWebhookLogEntity) -> Result<Uuid>;

    async fn mark_processed(&self, id: Uuid) -> Result<()>;

    async fn mark_failed(&self, id: Uuid, error: String) -> Result<()>;
}
