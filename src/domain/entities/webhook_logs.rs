use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::webhook_logs;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = webhook_logs)]
pub struct WebhookLogEntity {
    pub id: Uuid,
    pub event_type: String,
    pub event_id: Option<String>,
    pub payload: serde_json::Value,
    pub status: String,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = webhook_logs)]
pub struct InsertWebhookLogEntity {
    pub event_type: String,
    pub event_id: Option<String>,
    pub payload: serde_json::Value,
    pub status: String,
}
