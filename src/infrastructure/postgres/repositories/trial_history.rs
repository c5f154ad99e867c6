use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, dsl::exists, insert_into, prelude::*, select, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::trial_history::InsertTrialHistoryEntity;
use crate::domain::repositories::trial_history::TrialHistoryRepository;
use crate::domain::value_objects::enums::trial_statuses::TrialStatus;
use crate::infrastructure::postgres::{postgres_connection::PgPool, schema::trial_history};

pub struct TrialHistoryPostgres {
    db_pool: Arc<PgPool>,
}

impl TrialHistoryPostgres {
    pub fn new(db_pool: Arc<PgPool>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl TrialHistoryRepository for TrialHistoryPostgres {
    async fn insert_if_absent(&self, insert_trial: InsertTrialHistoryEntity) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // ON CONFLICT DO NOTHING makes check-and-insert one atomic statement;
        // the second of two racing claims affects zero rows.
        let inserted = insert_into(trial_history::table)
            .values(&insert_trial)
            .on_conflict((trial_history::user_id, trial_history::product_id))
            .do_nothing()
            .execute(&mut conn)?;

        Ok(inserted > 0)
    }

    async fn exists(&self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let found = select(exists(
            trial_history::table
                .filter(trial_history::user_id.eq(user_id))
                .filter(trial_history::product_id.eq(product_id)),
        ))
        .get_result::<bool>(&mut conn)?;

        Ok(found)
    }

    async fn update_status_by_subscription(
        &self,
        subscription_id: Uuid,
        status: TrialStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(trial_history::table)
            .filter(trial_history::subscription_id.eq(subscription_id))
            .set((
                trial_history::status.eq(status.to_string()),
                trial_history::ended_at.eq(ended_at),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
