use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::trial_history::InsertTrialHistoryEntity;
use crate::domain::value_objects::enums::trial_statuses::TrialStatus;

#[automock]
#[async_trait]
pub trait TrialHistoryRepository {
    /// Inserts under the UNIQUE(user_id, product_id) constraint. Returns
    /// false when the pair already consumed its trial; the insert and the
    /// existence check happen in one statement so racing callers cannot both
    /// succeed.
    async fn insert_if_absent(&self, insert_trial: InsertTrialHistoryEntity) -> Result<bool>;

    async fn exists(&self, user_id: Uuid, product_id: Uuid) -> Result<bool>;

    async fn update_status_by_subscription(
        &self,
        subscription_id: Uuid,
        status: TrialStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<()>;
}
