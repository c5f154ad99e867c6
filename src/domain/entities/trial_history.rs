use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::trial_history;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = trial_history)]
pub struct TrialHistoryEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub subscription_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = trial_history)]
pub struct InsertTrialHistoryEntity {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub subscription_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
}
