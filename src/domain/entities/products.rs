use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::value_objects::enums::{
    billing_intervals::BillingInterval, trial_periods::TrialPeriod,
};
use crate::infrastructure::postgres::schema::products;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = products)]
pub struct ProductEntity {
    pub id: Uuid,
    pub name: String,
    pub is_subscription: bool,
    pub trial_enabled: bool,
    pub trial_duration: i32,
    pub trial_period: String,
    pub trial_price_minor: i32,
    pub recurring_price_minor: i32,
    pub signup_fee_minor: i32,
    pub billing_interval: String,
    pub max_cycles: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ProductEntity {
    pub fn billing_interval(&self) -> BillingInterval {
        BillingInterval::from_str(&self.billing_interval)
    }

    pub fn has_trial(&self) -> bool {
        self.trial_enabled && self.trial_duration > 0
    }

    pub fn trial_days(&self) -> i64 {
        TrialPeriod::from_str(&self.trial_period)
            .unwrap_or(TrialPeriod::Day)
            .to_days(self.trial_duration)
    }
}
