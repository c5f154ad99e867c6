use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::webhook_logs::InsertWebhookLogEntity;
use crate::domain::repositories::webhook_logs::WebhookLogRepository;
use crate::domain::value_objects::enums::webhook_log_statuses::WebhookLogStatus;
use crate::infrastructure::postgres::{postgres_connection::PgPool, schema::webhook_logs};

pub struct WebhookLogPostgres {
    db_pool: Arc<PgPool>,
}

impl WebhookLogPostgres {
    pub fn new(db_pool: Arc<PgPool>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl WebhookLogRepository for WebhookLogPostgres {
    async fn insert(&self, insert_log: InsertWebhookLogEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(webhook_logs::table)
            .values(&insert_log)
            .returning(webhook_logs::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(result)
    }

    async fn mark_processed(&self, id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(webhook_logs::table)
            .filter(webhook_logs::id.eq(id))
            .set((
                webhook_logs::status.eq(WebhookLogStatus::Processed.to_string()),
                webhook_logs::processed_at.eq(Some(Utc::now())),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: String) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(webhook_logs::table)
            .filter(webhook_logs::id.eq(id))
            .set((
                webhook_logs::status.eq(WebhookLogStatus::Failed.to_string()),
                webhook_logs::error.eq(Some(error)),
                webhook_logs::processed_at.eq(Some(Utc::now())),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
