use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::value_objects::enums::{
    billing_intervals::BillingInterval, subscription_statuses::SubscriptionStatus,
};
use crate::infrastructure::postgres::schema::subscriptions;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub gateway_subscription_id: Option<String>,
    pub gateway_customer_id: Option<String>,
    pub trial_price_minor: i32,
    pub recurring_price_minor: i32,
    pub signup_fee_minor: i32,
    pub billing_interval: String,
    pub trial_starts_at: Option<DateTime<Utc>>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub next_payment_at: Option<DateTime<Utc>>,
    pub last_payment_at: Option<DateTime<Utc>>,
    pub current_cycle: i32,
    pub max_cycles: Option<i32>,
    pub failed_payment_count: i32,
    pub status: String,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionEntity {
    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_str(&self.status)
    }

    pub fn billing_interval(&self) -> BillingInterval {
        BillingInterval::from_str(&self.billing_interval)
    }

    /// True once the configured cycle limit has been reached. Unlimited when
    /// `max_cycles` is NULL.
    pub fn reached_max_cycles(&self) -> bool {
        self.max_cycles
            .map(|max| self.current_cycle >= max)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct InsertSubscriptionEntity {
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub gateway_subscription_id: Option<String>,
    pub gateway_customer_id: Option<String>,
    pub trial_price_minor: i32,
    pub recurring_price_minor: i32,
    pub signup_fee_minor: i32,
    pub billing_interval: String,
    pub trial_starts_at: Option<DateTime<Utc>>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub next_payment_at: Option<DateTime<Utc>>,
    pub current_cycle: i32,
    pub max_cycles: Option<i32>,
    pub failed_payment_count: i32,
    pub status: String,
}
