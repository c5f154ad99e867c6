use std::sync::Arc;

use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::notifications::NotificationSink;
use crate::domain::entities::payments::InsertPaymentEntity;
use crate::domain::entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity};
use crate::domain::entities::trial_history::InsertTrialHistoryEntity;
use crate::domain::repositories::{
    payments::PaymentRepository, products::ProductRepository,
    subscriptions::SubscriptionRepository, trial_history::TrialHistoryRepository,
};
use crate::domain::value_objects::enums::{
    payment_statuses::PaymentStatus, subscription_statuses::SubscriptionStatus,
    trial_statuses::TrialStatus,
};
use crate::domain::value_objects::lifecycle_events::LifecycleEvent;
use crate::domain::value_objects::subscriptions::{
    CheckoutOrder, OrderLineMeta, SubscriptionKind,
};

/// Retry and grace knobs shared by the state machine and the renewal sweeps.
#[derive(Debug, Clone)]
pub struct BillingPolicy {
    pub max_payment_retries: i32,
    pub retry_interval_days: i64,
    pub auto_cancel_on_exhaustion: bool,
    pub failed_grace_days: i64,
    pub overdue_grace_hours: i64,
    pub trial_reminder_days: i64,
    pub charge_throttle_ms: u64,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            max_payment_retries: 3,
            retry_interval_days: 2,
            auto_cancel_on_exhaustion: false,
            failed_grace_days: 30,
            overdue_grace_hours: 6,
            trial_reminder_days: 3,
            charge_throttle_ms: 250,
        }
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("subscription not found")]
    NotFound,
    #[error("invalid status transition: {0}")]
    InvalidTransition(String),
    #[error("product not found")]
    ProductNotFound,
    #[error("product is not a subscription")]
    NotASubscription,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl LifecycleError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            LifecycleError::NotFound | LifecycleError::ProductNotFound => StatusCode::NOT_FOUND,
            LifecycleError::InvalidTransition(_) => StatusCode::CONFLICT,
            LifecycleError::NotASubscription => StatusCode::BAD_REQUEST,
            LifecycleError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Changed,
    Unchanged,
}

pub struct SubscriptionLifecycleUseCase {
    subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
    product_repo: Arc<dyn ProductRepository + Send + Sync>,
    payment_repo: Arc<dyn PaymentRepository + Send + Sync>,
    trial_history_repo: Arc<dyn TrialHistoryRepository + Send + Sync>,
    notifier: Arc<dyn NotificationSink>,
    policy: BillingPolicy,
}

impl SubscriptionLifecycleUseCase {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
        product_repo: Arc<dyn ProductRepository + Send + Sync>,
        payment_repo: Arc<dyn PaymentRepository + Send + Sync>,
        trial_history_repo: Arc<dyn TrialHistoryRepository + Send + Sync>,
        notifier: Arc<dyn NotificationSink>,
        policy: BillingPolicy,
    ) -> Self {
        Self {
            subscription_repo,
            product_repo,
            payment_repo,
            trial_history_repo,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> &BillingPolicy {
        &self.policy
    }

    /// Moves a subscription to `new_status`. Same-status calls are no-ops so
    /// duplicate webhook deliveries converge instead of erroring.
    pub async fn transition(
        &self,
        subscription_id: Uuid,
        new_status: SubscriptionStatus,
        reason: Option<&str>,
    ) -> LifecycleResult<TransitionOutcome> {
        let subscription = self
            .subscription_repo
            .find_by_id(subscription_id)
            .await
            .map_err(|err| {
                error!(
                    %subscription_id,
                    db_error = ?err,
                    "lifecycle: failed to load subscription for transition"
                );
                LifecycleError::Internal(err)
            })?
            .ok_or(LifecycleError::NotFound)?;

        let old_status = subscription.status();
        if old_status == new_status {
            debug!(
                %subscription_id,
                status = %new_status,
                "lifecycle: transition to current status is a no-op"
            );
            return Ok(TransitionOutcome::Unchanged);
        }

        Self::ensure_transition_allowed(old_status, new_status)?;

        match new_status {
            SubscriptionStatus::Active if old_status == SubscriptionStatus::Trial => {
                let next_payment_at =
                    Utc::now() + Duration::days(subscription.billing_interval().days());
                self.subscription_repo
                    .activate_from_trial(subscription_id, next_payment_at)
                    .await
                    .map_err(LifecycleError::Internal)?;
                self.trial_history_repo
                    .update_status_by_subscription(
                        subscription_id,
                        TrialStatus::Converted,
                        Some(Utc::now()),
                    )
                    .await
                    .map_err(LifecycleError::Internal)?;
            }
            SubscriptionStatus::Cancelled => {
                self.subscription_repo
                    .mark_cancelled(subscription_id, reason.map(String::from))
                    .await
                    .map_err(LifecycleError::Internal)?;
                if old_status == SubscriptionStatus::Trial {
                    self.trial_history_repo
                        .update_status_by_subscription(
                            subscription_id,
                            TrialStatus::Cancelled,
                            Some(Utc::now()),
                        )
                        .await
                        .map_err(LifecycleError::Internal)?;
                }
            }
            SubscriptionStatus::Expired => {
                self.subscription_repo
                    .mark_expired(subscription_id)
                    .await
                    .map_err(LifecycleError::Internal)?;
            }
            _ => {
                self.subscription_repo
                    .update_status(subscription_id, new_status)
                    .await
                    .map_err(LifecycleError::Internal)?;
            }
        }

        info!(
            %subscription_id,
            old_status = %old_status,
            new_status = %new_status,
            reason = ?reason,
            "lifecycle: subscription status changed"
        );

        self.notifier.notify(LifecycleEvent::StatusChanged {
            subscription_id,
            old_status,
            new_status,
        });

        Ok(TransitionOutcome::Changed)
    }

    /// Creates the subscription for a completed order. Idempotent by order
    /// id: a duplicate order-completion event returns the existing row.
    pub async fn create_from_order(&self, order: &CheckoutOrder) -> LifecycleResult<Uuid> {
        info!(
            order_id = %order.order_id,
            user_id = %order.user_id,
            product_id = %order.product_id,
            "lifecycle: order completion received"
        );

        if let Some(existing) = self
            .subscription_repo
            .find_by_order_id(order.order_id)
            .await
            .map_err(LifecycleError::Internal)?
        {
            info!(
                order_id = %order.order_id,
                subscription_id = %existing.id,
                "lifecycle: order already has a subscription"
            );
            return Ok(existing.id);
        }

        let product = self
            .product_repo
            .find_by_id(order.product_id)
            .await
            .map_err(LifecycleError::Internal)?
            .filter(|product| product.is_active)
            .ok_or(LifecycleError::ProductNotFound)?;

        if !product.is_subscription {
            return Err(LifecycleError::NotASubscription);
        }

        let mut line = OrderLineMeta::from_product(&product);

        // A consumed trial downgrades the purchase to a regular start before
        // the row is created; the uniqueness constraint still backstops races.
        if line.kind == SubscriptionKind::Trial
            && self
                .trial_history_repo
                .exists(order.user_id, order.product_id)
                .await
                .map_err(LifecycleError::Internal)?
        {
            info!(
                user_id = %order.user_id,
                product_id = %order.product_id,
                "lifecycle: trial already consumed; starting without trial"
            );
            line.kind = SubscriptionKind::Regular;
        }

        let now = Utc::now();
        let interval_days = Duration::days(line.snapshot.billing_interval.days());
        let (status, trial_starts_at, trial_ends_at, next_payment_at) = match line.kind {
            SubscriptionKind::Trial => {
                let trial_ends_at = now + Duration::days(product.trial_days());
                (
                    SubscriptionStatus::Trial,
                    Some(now),
                    Some(trial_ends_at),
                    Some(trial_ends_at),
                )
            }
            SubscriptionKind::Regular => {
                (SubscriptionStatus::Active, None, None, Some(now + interval_days))
            }
        };

        let subscription_id = self
            .subscription_repo
            .create(InsertSubscriptionEntity {
                user_id: order.user_id,
                order_id: order.order_id,
                product_id: order.product_id,
                gateway_subscription_id: order.gateway_subscription_id.clone(),
                gateway_customer_id: order.gateway_customer_id.clone(),
                trial_price_minor: line.snapshot.trial_price_minor,
                recurring_price_minor: line.snapshot.recurring_price_minor,
                signup_fee_minor: line.snapshot.signup_fee_minor,
                billing_interval: line.snapshot.billing_interval.to_string(),
                trial_starts_at,
                trial_ends_at,
                next_payment_at,
                current_cycle: 0,
                max_cycles: product.max_cycles,
                failed_payment_count: 0,
                status: status.to_string(),
            })
            .await
            .map_err(|err| {
                error!(
                    order_id = %order.order_id,
                    db_error = ?err,
                    "lifecycle: failed to create subscription"
                );
                LifecycleError::Internal(err)
            })?;

        if status == SubscriptionStatus::Trial {
            let recorded = self
                .trial_history_repo
                .insert_if_absent(InsertTrialHistoryEntity {
                    user_id: order.user_id,
                    product_id: order.product_id,
                    subscription_id,
                    status: TrialStatus::Active.to_string(),
                    started_at: now,
                })
                .await
                .map_err(LifecycleError::Internal)?;

            if !recorded {
                // Lost the race to a concurrent checkout for the same pair.
                warn!(
                    user_id = %order.user_id,
                    product_id = %order.product_id,
                    %subscription_id,
                    "lifecycle: duplicate trial blocked by constraint; activating without trial"
                );
                self.subscription_repo
                    .activate_from_trial(subscription_id, now + interval_days)
                    .await
                    .map_err(LifecycleError::Internal)?;
            }
        }

        info!(
            %subscription_id,
            order_id = %order.order_id,
            status = %status,
            "lifecycle: subscription created"
        );

        self.notifier.notify(LifecycleEvent::Created {
            subscription_id,
            user_id: order.user_id,
            status,
        });

        Ok(subscription_id)
    }

    /// Credits one billing cycle for a captured charge. De-duplicated on the
    /// gateway payment id so scheduler- and webhook-driven crediting of the
    /// same charge converge to a single cycle advance.
    pub async fn apply_successful_charge(
        &self,
        subscription: &SubscriptionEntity,
        gateway_payment_id: &str,
        amount_minor: i32,
    ) -> LifecycleResult<()> {
        if self
            .payment_repo
            .find_by_gateway_payment_id(gateway_payment_id)
            .await
            .map_err(LifecycleError::Internal)?
            .is_some()
        {
            info!(
                subscription_id = %subscription.id,
                gateway_payment_id,
                "lifecycle: charge already credited; skipping"
            );
            return Ok(());
        }

        self.payment_repo
            .record_payment(InsertPaymentEntity {
                subscription_id: subscription.id,
                amount_minor,
                status: PaymentStatus::Completed.to_string(),
                gateway_payment_id: Some(gateway_payment_id.to_string()),
                error: None,
            })
            .await
            .map_err(LifecycleError::Internal)?;

        // The gateway can capture the first recurring charge before our own
        // trial-end sweep runs; converge through the same transition.
        if subscription.status() == SubscriptionStatus::Trial {
            self.transition(
                subscription.id,
                SubscriptionStatus::Active,
                Some("first recurring charge captured"),
            )
            .await?;
        }

        let now = Utc::now();
        let next_payment_at = now + Duration::days(subscription.billing_interval().days());
        self.subscription_repo
            .record_renewal(subscription.id, next_payment_at, now)
            .await
            .map_err(LifecycleError::Internal)?;

        info!(
            subscription_id = %subscription.id,
            gateway_payment_id,
            cycle = subscription.current_cycle + 1,
            next_payment_at = %next_payment_at,
            "lifecycle: renewal credited"
        );

        self.notifier.notify(LifecycleEvent::Renewed {
            subscription_id: subscription.id,
            cycle: subscription.current_cycle + 1,
            amount_minor,
        });

        Ok(())
    }

    /// Records a failed charge and applies the retry policy: cool-down below
    /// the retry threshold, cancelled/failed at it.
    pub async fn apply_failed_charge(
        &self,
        subscription: &SubscriptionEntity,
        reason: &str,
        gateway_payment_id: Option<&str>,
    ) -> LifecycleResult<()> {
        if let Some(gateway_payment_id) = gateway_payment_id {
            if self
                .payment_repo
                .find_by_gateway_payment_id(gateway_payment_id)
                .await
                .map_err(LifecycleError::Internal)?
                .is_some()
            {
                info!(
                    subscription_id = %subscription.id,
                    gateway_payment_id,
                    "lifecycle: failed charge already recorded; skipping"
                );
                return Ok(());
            }
        }

        self.payment_repo
            .record_payment(InsertPaymentEntity {
                subscription_id: subscription.id,
                amount_minor: subscription.recurring_price_minor,
                status: PaymentStatus::Failed.to_string(),
                gateway_payment_id: gateway_payment_id.map(String::from),
                error: Some(reason.to_string()),
            })
            .await
            .map_err(LifecycleError::Internal)?;

        let attempt = subscription.failed_payment_count + 1;
        let max_attempts = self.policy.max_payment_retries;

        if attempt >= max_attempts {
            warn!(
                subscription_id = %subscription.id,
                attempt,
                max_attempts,
                "lifecycle: payment retries exhausted"
            );
            self.subscription_repo
                .record_payment_failure(subscription.id, attempt, None)
                .await
                .map_err(LifecycleError::Internal)?;

            let final_status = if self.policy.auto_cancel_on_exhaustion {
                SubscriptionStatus::Cancelled
            } else {
                SubscriptionStatus::Failed
            };
            self.transition(
                subscription.id,
                final_status,
                Some("payment retries exhausted"),
            )
            .await?;
            return Ok(());
        }

        let retry_at = Utc::now() + Duration::days(self.policy.retry_interval_days);
        self.subscription_repo
            .record_payment_failure(subscription.id, attempt, Some(retry_at))
            .await
            .map_err(LifecycleError::Internal)?;

        warn!(
            subscription_id = %subscription.id,
            attempt,
            max_attempts,
            retry_at = %retry_at,
            reason,
            "lifecycle: payment failed; retry scheduled"
        );

        self.notifier.notify(LifecycleEvent::PaymentFailed {
            subscription_id: subscription.id,
            attempt,
            max_attempts,
        });

        Ok(())
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> LifecycleResult<Vec<SubscriptionEntity>> {
        self.subscription_repo
            .list_by_user(user_id)
            .await
            .map_err(LifecycleError::Internal)
    }

    /// Subscriber-initiated cancellation. Ownership is checked before the
    /// transition; a foreign id reads as not found.
    pub async fn cancel_for_user(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
        reason: Option<&str>,
    ) -> LifecycleResult<TransitionOutcome> {
        self.ensure_owned_by(user_id, subscription_id).await?;
        self.transition(
            subscription_id,
            SubscriptionStatus::Cancelled,
            reason.or(Some("cancelled by subscriber")),
        )
        .await
    }

    pub async fn pause_for_user(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
    ) -> LifecycleResult<TransitionOutcome> {
        let subscription = self.ensure_owned_by(user_id, subscription_id).await?;
        if subscription.status() != SubscriptionStatus::Active {
            return Err(LifecycleError::InvalidTransition(
                "only active subscriptions can be paused".to_string(),
            ));
        }
        self.transition(
            subscription_id,
            SubscriptionStatus::Paused,
            Some("paused by subscriber"),
        )
        .await
    }

    pub async fn resume_for_user(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
    ) -> LifecycleResult<TransitionOutcome> {
        let subscription = self.ensure_owned_by(user_id, subscription_id).await?;
        if subscription.status() != SubscriptionStatus::Paused {
            return Err(LifecycleError::InvalidTransition(
                "only paused subscriptions can be resumed".to_string(),
            ));
        }
        self.transition(
            subscription_id,
            SubscriptionStatus::Active,
            Some("resumed by subscriber"),
        )
        .await
    }

    async fn ensure_owned_by(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
    ) -> LifecycleResult<SubscriptionEntity> {
        self.subscription_repo
            .find_by_id(subscription_id)
            .await
            .map_err(LifecycleError::Internal)?
            .filter(|subscription| subscription.user_id == user_id)
            .ok_or(LifecycleError::NotFound)
    }

    /// Terminal statuses are frozen and `failed` only drains to
    /// cancelled/expired; everything else stays permissive so administrative
    /// overrides keep working.
    fn ensure_transition_allowed(
        old_status: SubscriptionStatus,
        new_status: SubscriptionStatus,
    ) -> LifecycleResult<()> {
        if old_status.is_terminal() {
            return Err(LifecycleError::InvalidTransition(format!(
                "{} is terminal",
                old_status
            )));
        }

        if old_status == SubscriptionStatus::Failed
            && !matches!(
                new_status,
                SubscriptionStatus::Cancelled | SubscriptionStatus::Expired
            )
        {
            return Err(LifecycleError::InvalidTransition(format!(
                "failed may only become cancelled or expired, not {}",
                new_status
            )));
        }

        Ok(())
    }
}
