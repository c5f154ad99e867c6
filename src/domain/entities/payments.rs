use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::payments;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub amount_minor: i32,
    pub status: String,
    pub gateway_payment_id: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub subscription_id: Uuid,
    pub amount_minor: i32,
    pub status: String,
    pub gateway_payment_id: Option<String>,
    pub error: Option<String>,
}
