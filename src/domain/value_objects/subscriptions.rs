use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{products::ProductEntity, subscriptions::SubscriptionEntity};
use crate::domain::value_objects::enums::{
    billing_intervals::BillingInterval, subscription_statuses::SubscriptionStatus,
};

/// Order-completion payload from the storefront. One subscription per order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutOrder {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub gateway_subscription_id: Option<String>,
    pub gateway_customer_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionKind {
    Trial,
    Regular,
}

/// Pricing terms captured at purchase time. Later product edits do not
/// retroactively change an existing subscriber's terms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceSnapshot {
    pub trial_price_minor: i32,
    pub recurring_price_minor: i32,
    pub signup_fee_minor: i32,
    pub billing_interval: BillingInterval,
}

/// Typed metadata for the subscription line item of an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLineMeta {
    pub kind: SubscriptionKind,
    pub snapshot: PriceSnapshot,
}

impl OrderLineMeta {
    pub fn from_product(product: &ProductEntity) -> Self {
        let kind = if product.has_trial() {
            SubscriptionKind::Trial
        } else {
            SubscriptionKind::Regular
        };

        Self {
            kind,
            snapshot: PriceSnapshot {
                trial_price_minor: product.trial_price_minor,
                recurring_price_minor: product.recurring_price_minor,
                signup_fee_minor: product.signup_fee_minor,
                billing_interval: product.billing_interval(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscriptionDto {
    pub id: Uuid,
    pub product_id: Uuid,
    pub status: SubscriptionStatus,
    pub billing_interval: BillingInterval,
    pub recurring_price_minor: i32,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub next_payment_at: Option<DateTime<Utc>>,
    pub current_cycle: i32,
    pub max_cycles: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<SubscriptionEntity> for SubscriptionDto {
    fn from(value: SubscriptionEntity) -> Self {
        Self {
            id: value.id,
            product_id: value.product_id,
            status: SubscriptionStatus::from_str(&value.status),
            billing_interval: BillingInterval::from_str(&value.billing_interval),
            recurring_price_minor: value.recurring_price_minor,
            trial_ends_at: value.trial_ends_at,
            next_payment_at: value.next_payment_at,
            current_cycle: value.current_cycle,
            max_cycles: value.max_cycles,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CancelSubscriptionRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSubscriptionResponse {
    pub subscription_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct TrialEligibilityDto {
    pub eligible: bool,
    pub reason: Option<String>,
}
