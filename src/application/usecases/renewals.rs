use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Result;
use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use crate::application::gateway::PaymentGateway;
use crate::application::notifications::NotificationSink;
use crate::application::usecases::lifecycle::{BillingPolicy, SubscriptionLifecycleUseCase};
use crate::domain::entities::subscriptions::SubscriptionEntity;
use crate::domain::repositories::subscriptions::SubscriptionRepository;
use crate::domain::value_objects::enums::subscription_statuses::SubscriptionStatus;
use crate::domain::value_objects::lifecycle_events::LifecycleEvent;
use crate::infrastructure::payments::razorpay_client::ChargeOutcome;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub processed: usize,
    pub failed: usize,
}

pub struct RenewalUseCase {
    subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
    gateway: Arc<dyn PaymentGateway>,
    lifecycle: Arc<SubscriptionLifecycleUseCase>,
    notifier: Arc<dyn NotificationSink>,
    policy: BillingPolicy,
}

impl RenewalUseCase {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
        gateway: Arc<dyn PaymentGateway>,
        lifecycle: Arc<SubscriptionLifecycleUseCase>,
        notifier: Arc<dyn NotificationSink>,
        policy: BillingPolicy,
    ) -> Self {
        Self {
            subscription_repo,
            gateway,
            lifecycle,
            notifier,
            policy,
        }
    }

    /// Main due-payment sweep. One subscription failing never aborts the
    /// batch; its outcome is logged and the loop moves on.
    pub async fn process_due_renewals(&self) -> Result<SweepSummary> {
        let due = self.subscription_repo.list_due_for_renewal(Utc::now()).await?;
        info!(count = due.len(), "renewals: due subscriptions loaded");
        self.process_batch(due).await
    }

    /// Secondary sweep for subscriptions the main sweep missed: anything
    /// overdue past the grace window gets another attempt.
    pub async fn retry_overdue(&self) -> Result<SweepSummary> {
        let cutoff = Utc::now() - Duration::hours(self.policy.overdue_grace_hours);
        let overdue = self.subscription_repo.list_due_for_renewal(cutoff).await?;
        info!(count = overdue.len(), "renewals: overdue subscriptions loaded");
        self.process_batch(overdue).await
    }

    /// Ends trials that have run out: the first recurring charge either
    /// converts the subscription or feeds the standard retry policy.
    pub async fn process_expired_trials(&self) -> Result<SweepSummary> {
        let expired = self.subscription_repo.list_expired_trials(Utc::now()).await?;
        info!(count = expired.len(), "renewals: expired trials loaded");

        let mut summary = SweepSummary::default();
        for subscription in expired {
            summary.processed += 1;
            if let Err(error) = self.charge_subscription(&subscription).await {
                summary.failed += 1;
                error!(
                    subscription_id = %subscription.id,
                    error = ?error,
                    "renewals: trial-end processing failed; continuing batch"
                );
            }
            self.throttle().await;
        }
        Ok(summary)
    }

    /// Subscriptions stuck in `failed` past the grace period expire for good.
    pub async fn expire_stale_failed(&self) -> Result<SweepSummary> {
        let cutoff = Utc::now() - Duration::days(self.policy.failed_grace_days);
        let stale = self.subscription_repo.list_failed_before(cutoff).await?;
        info!(count = stale.len(), "renewals: stale failed subscriptions loaded");

        let mut summary = SweepSummary::default();
        for subscription in stale {
            summary.processed += 1;
            if let Err(error) = self
                .lifecycle
                .transition(
                    subscription.id,
                    SubscriptionStatus::Expired,
                    Some("failed grace period elapsed"),
                )
                .await
            {
                summary.failed += 1;
                error!(
                    subscription_id = %subscription.id,
                    error = ?error,
                    "renewals: failed-expiry transition failed; continuing batch"
                );
            }
        }
        Ok(summary)
    }

    /// Daily reminder pass for trials about to convert.
    pub async fn send_trial_ending_reminders(&self) -> Result<usize> {
        let now = Utc::now();
        let window_end = now + Duration::days(self.policy.trial_reminder_days);
        let ending = self
            .subscription_repo
            .list_trials_ending_between(now, window_end)
            .await?;

        for subscription in &ending {
            if let Some(trial_ends_at) = subscription.trial_ends_at {
                self.notifier.notify(LifecycleEvent::TrialEndingSoon {
                    subscription_id: subscription.id,
                    trial_ends_at,
                });
            }
        }

        info!(count = ending.len(), "renewals: trial-ending reminders emitted");
        Ok(ending.len())
    }

    async fn process_batch(
        &self,
        subscriptions: Vec<SubscriptionEntity>,
    ) -> Result<SweepSummary> {
        let mut summary = SweepSummary::default();
        for subscription in subscriptions {
            summary.processed += 1;
            if let Err(error) = self.renew_one(&subscription).await {
                summary.failed += 1;
                error!(
                    subscription_id = %subscription.id,
                    error = ?error,
                    "renewals: processing failed; continuing batch"
                );
            }
            self.throttle().await;
        }
        Ok(summary)
    }

    async fn renew_one(&self, subscription: &SubscriptionEntity) -> Result<()> {
        if subscription.reached_max_cycles() {
            info!(
                subscription_id = %subscription.id,
                current_cycle = subscription.current_cycle,
                max_cycles = ?subscription.max_cycles,
                "renewals: cycle limit reached; expiring without charge"
            );
            self.lifecycle
                .transition(
                    subscription.id,
                    SubscriptionStatus::Expired,
                    Some("max cycles reached"),
                )
                .await?;
            return Ok(());
        }

        self.charge_subscription(subscription).await
    }

    async fn charge_subscription(&self, subscription: &SubscriptionEntity) -> Result<()> {
        match self.gateway.charge(subscription).await {
            Ok(ChargeOutcome::Captured { gateway_payment_id }) => {
                self.lifecycle
                    .apply_successful_charge(
                        subscription,
                        &gateway_payment_id,
                        subscription.recurring_price_minor,
                    )
                    .await?;
            }
            Ok(ChargeOutcome::Declined { reason }) => {
                self.lifecycle
                    .apply_failed_charge(subscription, &reason, None)
                    .await?;
            }
            Err(error) => {
                // Transport-level failures count against the retry budget the
                // same way a decline does.
                warn!(
                    subscription_id = %subscription.id,
                    error = ?error,
                    "renewals: gateway charge errored"
                );
                self.lifecycle
                    .apply_failed_charge(subscription, &format!("gateway error: {error}"), None)
                    .await?;
            }
        }

        Ok(())
    }

    async fn throttle(&self) {
        if self.policy.charge_throttle_ms > 0 {
            tokio::time::sleep(StdDuration::from_millis(self.policy.charge_throttle_ms)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::gateway::MockPaymentGateway;
    use crate::application::notifications::MockNotificationSink;
    use crate::domain::repositories::payments::MockPaymentRepository;
    use crate::domain::repositories::products::MockProductRepository;
    use crate::domain::repositories::subscriptions::MockSubscriptionRepository;
    use crate::domain::repositories::trial_history::MockTrialHistoryRepository;
    use crate::domain::value_objects::enums::trial_statuses::TrialStatus;
    use uuid::Uuid;

    fn test_policy() -> BillingPolicy {
        BillingPolicy {
            charge_throttle_ms: 0,
            ..BillingPolicy::default()
        }
    }

    fn subscription_fixture(status: SubscriptionStatus) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            gateway_subscription_id: Some("sub_gateway_1".to_string()),
            gateway_customer_id: Some("cust_gateway_1".to_string()),
            trial_price_minor: 0,
            recurring_price_minor: 49900,
            signup_fee_minor: 0,
            billing_interval: "monthly".to_string(),
            trial_starts_at: None,
            trial_ends_at: None,
            next_payment_at: Some(now - Duration::hours(1)),
            last_payment_at: None,
            current_cycle: 2,
            max_cycles: None,
            failed_payment_count: 0,
            status: status.to_string(),
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    struct Mocks {
        subscription_repo: MockSubscriptionRepository,
        sweep_repo: MockSubscriptionRepository,
        product_repo: MockProductRepository,
        payment_repo: MockPaymentRepository,
        trial_history_repo: MockTrialHistoryRepository,
        notifier: MockNotificationSink,
        gateway: MockPaymentGateway,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                subscription_repo: MockSubscriptionRepository::new(),
                sweep_repo: MockSubscriptionRepository::new(),
                product_repo: MockProductRepository::new(),
                payment_repo: MockPaymentRepository::new(),
                trial_history_repo: MockTrialHistoryRepository::new(),
                notifier: MockNotificationSink::new(),
                gateway: MockPaymentGateway::new(),
            }
        }

        fn into_usecase(self) -> RenewalUseCase {
            let policy = test_policy();
            let notifier = Arc::new(self.notifier);
            let lifecycle = Arc::new(SubscriptionLifecycleUseCase::new(
                Arc::new(self.subscription_repo),
                Arc::new(self.product_repo),
                Arc::new(self.payment_repo),
                Arc::new(self.trial_history_repo),
                Arc::clone(&notifier) as Arc<dyn NotificationSink>,
                policy.clone(),
            ));
            RenewalUseCase::new(
                Arc::new(self.sweep_repo),
                Arc::new(self.gateway),
                lifecycle,
                notifier,
                policy,
            )
        }
    }

    #[tokio::test]
    async fn max_cycles_expires_without_charging() {
        let mut subscription = subscription_fixture(SubscriptionStatus::Active);
        subscription.current_cycle = 12;
        subscription.max_cycles = Some(12);
        let reloaded = subscription.clone();

        let mut mocks = Mocks::new();
        mocks
            .sweep_repo
            .expect_list_due_for_renewal()
            .returning(move |_| Ok(vec![subscription.clone()]));
        mocks.gateway.expect_charge().times(0);
        mocks
            .subscription_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(reloaded.clone())));
        mocks
            .subscription_repo
            .expect_mark_expired()
            .times(1)
            .returning(|_| Ok(()));
        mocks.notifier.expect_notify().times(1).returning(|_| ());

        let usecase = mocks.into_usecase();
        let summary = usecase.process_due_renewals().await.unwrap();
        assert_eq!(summary, SweepSummary { processed: 1, failed: 0 });
    }

    #[tokio::test]
    async fn captured_charge_credits_the_cycle() {
        let subscription = subscription_fixture(SubscriptionStatus::Active);
        let subscription_id = subscription.id;

        let mut mocks = Mocks::new();
        mocks
            .sweep_repo
            .expect_list_due_for_renewal()
            .returning(move |_| Ok(vec![subscription.clone()]));
        mocks.gateway.expect_charge().times(1).returning(|_| {
            Ok(ChargeOutcome::Captured {
                gateway_payment_id: "pay_sweep_1".to_string(),
            })
        });
        mocks
            .payment_repo
            .expect_find_by_gateway_payment_id()
            .returning(|_| Ok(None));
        mocks
            .payment_repo
            .expect_record_payment()
            .times(1)
            .returning(|_| Ok(Uuid::new_v4()));
        mocks
            .subscription_repo
            .expect_record_renewal()
            .withf(move |id, _, _| *id == subscription_id)
            .times(1)
            .returning(|_, _, _| Ok(()));
        mocks.notifier.expect_notify().times(1).returning(|_| ());

        let usecase = mocks.into_usecase();
        let summary = usecase.process_due_renewals().await.unwrap();
        assert_eq!(summary, SweepSummary { processed: 1, failed: 0 });
    }

    #[tokio::test]
    async fn one_failing_subscription_does_not_abort_the_batch() {
        let poisoned = subscription_fixture(SubscriptionStatus::Active);
        let healthy = subscription_fixture(SubscriptionStatus::Active);
        let poisoned_id = poisoned.id;
        let healthy_id = healthy.id;

        let mut mocks = Mocks::new();
        mocks
            .sweep_repo
            .expect_list_due_for_renewal()
            .returning(move |_| Ok(vec![poisoned.clone(), healthy.clone()]));
        mocks.gateway.expect_charge().times(2).returning(|_| {
            Ok(ChargeOutcome::Captured {
                gateway_payment_id: format!("pay_{}", Uuid::new_v4()),
            })
        });
        mocks
            .payment_repo
            .expect_find_by_gateway_payment_id()
            .returning(|_| Ok(None));
        // The first subscription's ledger write blows up; the second one must
        // still be processed.
        mocks
            .payment_repo
            .expect_record_payment()
            .times(2)
            .returning(move |insert| {
                if insert.subscription_id == poisoned_id {
                    Err(anyhow::anyhow!("ledger write failed"))
                } else {
                    Ok(Uuid::new_v4())
                }
            });
        mocks
            .subscription_repo
            .expect_record_renewal()
            .withf(move |id, _, _| *id == healthy_id)
            .times(1)
            .returning(|_, _, _| Ok(()));
        mocks.notifier.expect_notify().times(1).returning(|_| ());

        let usecase = mocks.into_usecase();
        let summary = usecase.process_due_renewals().await.unwrap();
        assert_eq!(summary, SweepSummary { processed: 2, failed: 1 });
    }

    #[tokio::test]
    async fn declined_charge_feeds_the_retry_policy() {
        let subscription = subscription_fixture(SubscriptionStatus::Active);

        let mut mocks = Mocks::new();
        mocks
            .sweep_repo
            .expect_list_due_for_renewal()
            .returning(move |_| Ok(vec![subscription.clone()]));
        mocks.gateway.expect_charge().times(1).returning(|_| {
            Ok(ChargeOutcome::Declined {
                reason: "insufficient funds".to_string(),
            })
        });
        mocks
            .payment_repo
            .expect_record_payment()
            .withf(|insert| {
                insert.status == "failed"
                    && insert.error.as_deref() == Some("insufficient funds")
            })
            .times(1)
            .returning(|_| Ok(Uuid::new_v4()));
        mocks
            .subscription_repo
            .expect_record_payment_failure()
            .withf(|_, attempt, retry_at| *attempt == 1 && retry_at.is_some())
            .times(1)
            .returning(|_, _, _| Ok(()));
        mocks.notifier.expect_notify().times(1).returning(|_| ());

        let usecase = mocks.into_usecase();
        let summary = usecase.process_due_renewals().await.unwrap();
        assert_eq!(summary, SweepSummary { processed: 1, failed: 0 });
    }

    #[tokio::test]
    async fn expired_trial_converts_on_captured_charge() {
        let mut subscription = subscription_fixture(SubscriptionStatus::Trial);
        subscription.current_cycle = 0;
        subscription.trial_starts_at = Some(Utc::now() - Duration::days(14));
        subscription.trial_ends_at = Some(Utc::now() - Duration::hours(2));
        let reloaded = subscription.clone();

        let mut mocks = Mocks::new();
        mocks
            .sweep_repo
            .expect_list_expired_trials()
            .returning(move |_| Ok(vec![subscription.clone()]));
        mocks.gateway.expect_charge().times(1).returning(|_| {
            Ok(ChargeOutcome::Captured {
                gateway_payment_id: "pay_trial_end_1".to_string(),
            })
        });
        mocks
            .payment_repo
            .expect_find_by_gateway_payment_id()
            .returning(|_| Ok(None));
        mocks
            .payment_repo
            .expect_record_payment()
            .times(1)
            .returning(|_| Ok(Uuid::new_v4()));
        mocks
            .subscription_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(reloaded.clone())));
        mocks
            .subscription_repo
            .expect_activate_from_trial()
            .times(1)
            .returning(|_, _| Ok(()));
        mocks
            .trial_history_repo
            .expect_update_status_by_subscription()
            .withf(|_, status, _| *status == TrialStatus::Converted)
            .times(1)
            .returning(|_, _, _| Ok(()));
        mocks
            .subscription_repo
            .expect_record_renewal()
            .times(1)
            .returning(|_, _, _| Ok(()));
        // StatusChanged (trial -> active) plus Renewed.
        mocks.notifier.expect_notify().times(2).returning(|_| ());

        let usecase = mocks.into_usecase();
        let summary = usecase.process_expired_trials().await.unwrap();
        assert_eq!(summary, SweepSummary { processed: 1, failed: 0 });
    }

    #[tokio::test]
    async fn stale_failed_subscriptions_expire() {
        let mut subscription = subscription_fixture(SubscriptionStatus::Failed);
        subscription.updated_at = Utc::now() - Duration::days(45);
        let reloaded = subscription.clone();

        let mut mocks = Mocks::new();
        mocks
            .sweep_repo
            .expect_list_failed_before()
            .returning(move |_| Ok(vec![subscription.clone()]));
        mocks
            .subscription_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(reloaded.clone())));
        mocks
            .subscription_repo
            .expect_mark_expired()
            .times(1)
            .returning(|_| Ok(()));
        mocks.notifier.expect_notify().times(1).returning(|_| ());

        let usecase = mocks.into_usecase();
        let summary = usecase.expire_stale_failed().await.unwrap();
        assert_eq!(summary, SweepSummary { processed: 1, failed: 0 });
    }

    #[tokio::test]
    async fn trial_reminders_emit_one_event_per_trial() {
        let mut subscription = subscription_fixture(SubscriptionStatus::Trial);
        subscription.trial_ends_at = Some(Utc::now() + Duration::days(2));

        let mut mocks = Mocks::new();
        mocks
            .sweep_repo
            .expect_list_trials_ending_between()
            .returning(move |_, _| Ok(vec![subscription.clone()]));
        mocks
            .notifier
            .expect_notify()
            .withf(|event| matches!(event, LifecycleEvent::TrialEndingSoon { .. }))
            .times(1)
            .returning(|_| ());

        let usecase = mocks.into_usecase();
        let reminded = usecase.send_trial_ending_reminders().await.unwrap();
        assert_eq!(reminded, 1);
    }
}
