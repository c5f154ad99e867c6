use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity};
use crate::domain::value_objects::enums::subscription_statuses::SubscriptionStatus;

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    async fn create(&self, insert_subscription: InsertSubscriptionEntity) -> Result<Uuid>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SubscriptionEntity>>;

    async fn find_by_order_id(&self, order_id: Uuid) -> Result<Option<SubscriptionEntity>>;

    async fn find_by_gateway_subscription_id(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<Option<SubscriptionEntity>>;

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<SubscriptionEntity>>;

    async fn find_active_or_trial(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<SubscriptionEntity>>;

    /// Active subscriptions whose next payment is at or before `cutoff`.
    async fn list_due_for_renewal(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionEntity>>;

    /// Trial subscriptions whose trial has ended at or before `cutoff`.
    async fn list_expired_trials(&self, cutoff: DateTime<Utc>)
        -> Result<Vec<SubscriptionEntity>>;

    /// Trial subscriptions ending inside the (from, to] window.
    async fn list_trials_ending_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionEntity>>;

    /// Failed subscriptions that have been sitting in that state since before
    /// `cutoff`.
    async fn list_failed_before(&self, cutoff: DateTime<Utc>)
        -> Result<Vec<SubscriptionEntity>>;

    async fn update_status(&self, id: Uuid, status: SubscriptionStatus) -> Result<()>;

    /// Cancelled is terminal: persists the reason and clears the schedule.
    async fn mark_cancelled(&self, id: Uuid, reason: Option<String>) -> Result<()>;

    /// Expired is terminal: clears the schedule.
    async fn mark_expired(&self, id: Uuid) -> Result<()>;

    /// Trial conversion: status becomes active and the first recurring
    /// payment is scheduled.
    async fn activate_from_trial(&self, id: Uuid, next_payment_at: DateTime<Utc>) -> Result<()>;

    /// Successful charge bookkeeping: advances the schedule, bumps the cycle
    /// counter and resets the failure counter.
    async fn record_renewal(
        &self,
        id: Uuid,
        next_payment_at: DateTime<Utc>,
        paid_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Failed charge bookkeeping. `next_payment_at` is the retry cool-down,
    /// or None when no further attempt is scheduled.
    async fn record_payment_failure(
        &self,
        id: Uuid,
        failed_payment_count: i32,
        next_payment_at: Option<DateTime<Utc>>,
    ) -> Result<()>;
}
