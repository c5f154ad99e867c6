use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::application::gateway::PaymentGateway;
use crate::application::usecases::lifecycle::{
    LifecycleError, SubscriptionLifecycleUseCase,
};
use crate::domain::entities::subscriptions::SubscriptionEntity;
use crate::domain::entities::webhook_logs::InsertWebhookLogEntity;
use crate::domain::repositories::{
    subscriptions::SubscriptionRepository, webhook_logs::WebhookLogRepository,
};
use crate::domain::value_objects::enums::{
    subscription_statuses::SubscriptionStatus, webhook_log_statuses::WebhookLogStatus,
};
use crate::domain::value_objects::gateway_events::GatewayEvent;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook signature verification failed")]
    Auth,
    #[error("invalid webhook payload: {0}")]
    Validation(String),
    #[error("no subscription for gateway id {0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl WebhookError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            WebhookError::Auth => StatusCode::UNAUTHORIZED,
            WebhookError::Validation(_) => StatusCode::BAD_REQUEST,
            // Unresolvable subscriptions surface as 500 so the gateway's own
            // retry mechanism redelivers the event.
            WebhookError::NotFound(_) | WebhookError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<LifecycleError> for WebhookError {
    fn from(value: LifecycleError) -> Self {
        WebhookError::Internal(anyhow::Error::new(value))
    }
}

pub type WebhookResult<T> = std::result::Result<T, WebhookError>;

pub struct GatewayWebhookUseCase {
    gateway: Arc<dyn PaymentGateway>,
    webhook_log_repo: Arc<dyn WebhookLogRepository + Send + Sync>,
    subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
    lifecycle: Arc<SubscriptionLifecycleUseCase>,
}

impl GatewayWebhookUseCase {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        webhook_log_repo: Arc<dyn WebhookLogRepository + Send + Sync>,
        subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
        lifecycle: Arc<SubscriptionLifecycleUseCase>,
    ) -> Self {
        Self {
            gateway,
            webhook_log_repo,
            subscription_repo,
            lifecycle,
        }
    }

    /// Single entry point for gateway callbacks. The raw event is logged
    /// before any side effect so a crash mid-processing leaves an auditable
    /// `processing` row instead of silent loss.
    pub async fn handle_event(&self, payload: &[u8], signature: &str) -> WebhookResult<()> {
        if payload.is_empty() {
            return Err(WebhookError::Validation("empty body".to_string()));
        }

        self.gateway
            .verify_webhook_signature(payload, signature)
            .map_err(|err| {
                warn!(error = %err, "webhook: signature verification failed");
                WebhookError::Auth
            })?;

        let event: GatewayEvent = serde_json::from_slice(payload)
            .map_err(|err| WebhookError::Validation(err.to_string()))?;

        info!(event_type = %event.event, "webhook: event verified");

        let raw_payload: serde_json::Value =
            serde_json::from_slice(payload).unwrap_or(serde_json::Value::Null);
        let log_id = self
            .webhook_log_repo
            .insert(InsertWebhookLogEntity {
                event_type: event.event.clone(),
                event_id: event.external_ref(),
                payload: raw_payload,
                status: WebhookLogStatus::Processing.to_string(),
            })
            .await
            .map_err(WebhookError::Internal)?;

        match self.dispatch(&event).await {
            Ok(()) => {
                self.webhook_log_repo
                    .mark_processed(log_id)
                    .await
                    .map_err(WebhookError::Internal)?;
                Ok(())
            }
            Err(err) => {
                if let Err(log_error) = self
                    .webhook_log_repo
                    .mark_failed(log_id, err.to_string())
                    .await
                {
                    error!(
                        %log_id,
                        error = ?log_error,
                        "webhook: failed to mark log row failed"
                    );
                }
                Err(err)
            }
        }
    }

    async fn dispatch(&self, event: &GatewayEvent) -> WebhookResult<()> {
        match event.event.as_str() {
            "payment.captured" | "subscription.charged" => self.handle_charged(event).await,
            "payment.failed" => self.handle_payment_failed(event).await,
            "subscription.halted" => {
                self.transition_for(event, SubscriptionStatus::Failed, "halted by gateway")
                    .await
            }
            "subscription.cancelled" => {
                self.transition_for(
                    event,
                    SubscriptionStatus::Cancelled,
                    "cancelled via gateway",
                )
                .await
            }
            "subscription.completed" => {
                self.transition_for(event, SubscriptionStatus::Expired, "subscription completed")
                    .await
            }
            "subscription.activated" => self.handle_activated(event).await,
            "subscription.authenticated" => {
                info!(
                    gateway_subscription_id = ?event.gateway_subscription_id(),
                    "webhook: mandate authenticated"
                );
                Ok(())
            }
            other => {
                // The gateway grows new event types; acknowledge and move on.
                info!(event_type = other, "webhook: unrecognized event type acknowledged");
                Ok(())
            }
        }
    }

    async fn handle_charged(&self, event: &GatewayEvent) -> WebhookResult<()> {
        let subscription = self.resolve_subscription(event).await?;
        let payment = event.payment().ok_or_else(|| {
            WebhookError::Validation("charge event carries no payment entity".to_string())
        })?;

        let amount_minor = payment
            .amount
            .and_then(|amount| i32::try_from(amount).ok())
            .unwrap_or(subscription.recurring_price_minor);

        self.lifecycle
            .apply_successful_charge(&subscription, &payment.id, amount_minor)
            .await?;
        Ok(())
    }

    async fn handle_payment_failed(&self, event: &GatewayEvent) -> WebhookResult<()> {
        let subscription = self.resolve_subscription(event).await?;
        let payment = event.payment().ok_or_else(|| {
            WebhookError::Validation("failure event carries no payment entity".to_string())
        })?;

        let reason = payment
            .error_description
            .as_deref()
            .unwrap_or("payment failed at gateway");

        self.lifecycle
            .apply_failed_charge(&subscription, reason, Some(&payment.id))
            .await?;
        Ok(())
    }

    async fn handle_activated(&self, event: &GatewayEvent) -> WebhookResult<()> {
        let subscription = self.resolve_subscription(event).await?;
        match subscription.status() {
            SubscriptionStatus::Trial | SubscriptionStatus::Paused => {
                self.lifecycle
                    .transition(
                        subscription.id,
                        SubscriptionStatus::Active,
                        Some("activated by gateway"),
                    )
                    .await?;
                Ok(())
            }
            SubscriptionStatus::Active => Ok(()),
            // Failed subscriptions never revive automatically; terminal ones
            // are stale deliveries.
            other => {
                warn!(
                    subscription_id = %subscription.id,
                    status = %other,
                    "webhook: activation ignored for current status"
                );
                Ok(())
            }
        }
    }

    async fn transition_for(
        &self,
        event: &GatewayEvent,
        new_status: SubscriptionStatus,
        reason: &str,
    ) -> WebhookResult<()> {
        let subscription = self.resolve_subscription(event).await?;
        match self
            .lifecycle
            .transition(subscription.id, new_status, Some(reason))
            .await
        {
            Ok(_) => Ok(()),
            // Out-of-order delivery tolerance: a stale event against a
            // terminal subscription is acknowledged, not retried forever.
            Err(LifecycleError::InvalidTransition(detail)) => {
                warn!(
                    subscription_id = %subscription.id,
                    new_status = %new_status,
                    detail,
                    "webhook: stale transition ignored"
                );
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn resolve_subscription(
        &self,
        event: &GatewayEvent,
    ) -> WebhookResult<SubscriptionEntity> {
        let gateway_id = event.gateway_subscription_id().ok_or_else(|| {
            WebhookError::Validation("event carries no subscription reference".to_string())
        })?;

        self.subscription_repo
            .find_by_gateway_subscription_id(gateway_id)
            .await
            .map_err(WebhookError::Internal)?
            .ok_or_else(|| WebhookError::NotFound(gateway_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::gateway::MockPaymentGateway;
    use crate::application::notifications::MockNotificationSink;
    use crate::application::usecases::lifecycle::BillingPolicy;
    use crate::domain::entities::payments::PaymentEntity;
    use crate::domain::repositories::payments::MockPaymentRepository;
    use crate::domain::repositories::products::MockProductRepository;
    use crate::domain::repositories::subscriptions::MockSubscriptionRepository;
    use crate::domain::repositories::trial_history::MockTrialHistoryRepository;
    use crate::domain::repositories::webhook_logs::MockWebhookLogRepository;
    use chrono::Utc;
    use uuid::Uuid;

    fn subscription_fixture(status: SubscriptionStatus) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            gateway_subscription_id: Some("sub_gateway_77".to_string()),
            gateway_customer_id: Some("cust_gateway_77".to_string()),
            trial_price_minor: 0,
            recurring_price_minor: 49900,
            signup_fee_minor: 0,
            billing_interval: "monthly".to_string(),
            trial_starts_at: None,
            trial_ends_at: None,
            next_payment_at: Some(now),
            last_payment_at: None,
            current_cycle: 4,
            max_cycles: None,
            failed_payment_count: 0,
            status: status.to_string(),
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn charged_event_body() -> Vec<u8> {
        serde_json::json!({
            "entity": "event",
            "event": "subscription.charged",
            "created_at": 1_754_300_000,
            "payload": {
                "subscription": { "entity": { "id": "sub_gateway_77", "status": "active" } },
                "payment": { "entity": { "id": "pay_webhook_1", "amount": 49900, "status": "captured" } }
            }
        })
        .to_string()
        .into_bytes()
    }

    struct Mocks {
        gateway: MockPaymentGateway,
        webhook_log_repo: MockWebhookLogRepository,
        resolver_repo: MockSubscriptionRepository,
        subscription_repo: MockSubscriptionRepository,
        product_repo: MockProductRepository,
        payment_repo: MockPaymentRepository,
        trial_history_repo: MockTrialHistoryRepository,
        notifier: MockNotificationSink,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                gateway: MockPaymentGateway::new(),
                webhook_log_repo: MockWebhookLogRepository::new(),
                resolver_repo: MockSubscriptionRepository::new(),
                subscription_repo: MockSubscriptionRepository::new(),
                product_repo: MockProductRepository::new(),
                payment_repo: MockPaymentRepository::new(),
                trial_history_repo: MockTrialHistoryRepository::new(),
                notifier: MockNotificationSink::new(),
            }
        }

        fn into_usecase(self) -> GatewayWebhookUseCase {
            let lifecycle = Arc::new(SubscriptionLifecycleUseCase::new(
                Arc::new(self.subscription_repo),
                Arc::new(self.product_repo),
                Arc::new(self.payment_repo),
                Arc::new(self.trial_history_repo),
                Arc::new(self.notifier),
                BillingPolicy::default(),
            ));
            GatewayWebhookUseCase::new(
                Arc::new(self.gateway),
                Arc::new(self.webhook_log_repo),
                Arc::new(self.resolver_repo),
                lifecycle,
            )
        }
    }

    #[tokio::test]
    async fn empty_body_is_a_validation_error() {
        let usecase = Mocks::new().into_usecase();
        let result = usecase.handle_event(b"", "deadbeef").await;
        assert!(matches!(result, Err(WebhookError::Validation(_))));
    }

    #[tokio::test]
    async fn bad_signature_is_an_auth_error() {
        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_verify_webhook_signature()
            .returning(|_, _| Err(anyhow::anyhow!("invalid webhook signature")));

        let usecase = mocks.into_usecase();
        let result = usecase
            .handle_event(&charged_event_body(), "deadbeef")
            .await;
        assert!(matches!(result, Err(WebhookError::Auth)));
        assert_eq!(
            result.unwrap_err().status_code(),
            axum::http::StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn unparseable_body_is_a_validation_error() {
        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_verify_webhook_signature()
            .returning(|_, _| Ok(()));

        let usecase = mocks.into_usecase();
        let result = usecase.handle_event(b"not json", "deadbeef").await;
        assert!(matches!(result, Err(WebhookError::Validation(_))));
    }

    #[tokio::test]
    async fn charged_event_credits_cycle_and_marks_log_processed() {
        let subscription = subscription_fixture(SubscriptionStatus::Active);
        let subscription_id = subscription.id;
        let log_id = Uuid::new_v4();

        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_verify_webhook_signature()
            .returning(|_, _| Ok(()));
        mocks
            .webhook_log_repo
            .expect_insert()
            .withf(|insert| {
                insert.event_type == "subscription.charged" && insert.status == "processing"
            })
            .times(1)
            .returning(move |_| Ok(log_id));
        mocks
            .resolver_repo
            .expect_find_by_gateway_subscription_id()
            .withf(|gateway_id| gateway_id == "sub_gateway_77")
            .returning(move |_| Ok(Some(subscription.clone())));
        mocks
            .payment_repo
            .expect_find_by_gateway_payment_id()
            .returning(|_| Ok(None));
        mocks
            .payment_repo
            .expect_record_payment()
            .withf(|insert| insert.gateway_payment_id.as_deref() == Some("pay_webhook_1"))
            .times(1)
            .returning(|_| Ok(Uuid::new_v4()));
        mocks
            .subscription_repo
            .expect_record_renewal()
            .withf(move |id, _, _| *id == subscription_id)
            .times(1)
            .returning(|_, _, _| Ok(()));
        mocks
            .webhook_log_repo
            .expect_mark_processed()
            .withf(move |id| *id == log_id)
            .times(1)
            .returning(|_| Ok(()));
        mocks.notifier.expect_notify().times(1).returning(|_| ());

        let usecase = mocks.into_usecase();
        usecase
            .handle_event(&charged_event_body(), "deadbeef")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn replayed_charged_event_does_not_double_credit() {
        let subscription = subscription_fixture(SubscriptionStatus::Active);
        let recorded = PaymentEntity {
            id: Uuid::new_v4(),
            subscription_id: subscription.id,
            amount_minor: 49900,
            status: "completed".to_string(),
            gateway_payment_id: Some("pay_webhook_1".to_string()),
            error: None,
            created_at: Utc::now(),
        };

        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_verify_webhook_signature()
            .returning(|_, _| Ok(()));
        mocks
            .webhook_log_repo
            .expect_insert()
            .times(2)
            .returning(|_| Ok(Uuid::new_v4()));
        mocks
            .resolver_repo
            .expect_find_by_gateway_subscription_id()
            .returning(move |_| Ok(Some(subscription.clone())));
        // First delivery: unseen payment. Replay: the recorded row wins.
        let mut seen = false;
        mocks
            .payment_repo
            .expect_find_by_gateway_payment_id()
            .returning(move |_| {
                if seen {
                    Ok(Some(recorded.clone()))
                } else {
                    seen = true;
                    Ok(None)
                }
            });
        mocks
            .payment_repo
            .expect_record_payment()
            .times(1)
            .returning(|_| Ok(Uuid::new_v4()));
        mocks
            .subscription_repo
            .expect_record_renewal()
            .times(1)
            .returning(|_, _, _| Ok(()));
        mocks
            .webhook_log_repo
            .expect_mark_processed()
            .times(2)
            .returning(|_| Ok(()));
        mocks.notifier.expect_notify().times(1).returning(|_| ());

        let usecase = mocks.into_usecase();
        let body = charged_event_body();
        usecase.handle_event(&body, "deadbeef").await.unwrap();
        usecase.handle_event(&body, "deadbeef").await.unwrap();
    }

    #[tokio::test]
    async fn unknown_subscription_marks_log_failed_and_maps_to_500() {
        let log_id = Uuid::new_v4();

        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_verify_webhook_signature()
            .returning(|_, _| Ok(()));
        mocks
            .webhook_log_repo
            .expect_insert()
            .returning(move |_| Ok(log_id));
        mocks
            .resolver_repo
            .expect_find_by_gateway_subscription_id()
            .returning(|_| Ok(None));
        mocks
            .webhook_log_repo
            .expect_mark_failed()
            .withf(move |id, error| *id == log_id && error.contains("sub_gateway_77"))
            .times(1)
            .returning(|_, _| Ok(()));

        let usecase = mocks.into_usecase();
        let result = usecase
            .handle_event(&charged_event_body(), "deadbeef")
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, WebhookError::NotFound(_)));
        assert_eq!(
            err.status_code(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn unrecognized_event_type_is_acknowledged() {
        let log_id = Uuid::new_v4();
        let body = serde_json::json!({
            "entity": "event",
            "event": "subscription.pending",
            "payload": {}
        })
        .to_string()
        .into_bytes();

        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_verify_webhook_signature()
            .returning(|_, _| Ok(()));
        mocks
            .webhook_log_repo
            .expect_insert()
            .returning(move |_| Ok(log_id));
        mocks
            .webhook_log_repo
            .expect_mark_processed()
            .withf(move |id| *id == log_id)
            .times(1)
            .returning(|_| Ok(()));

        let usecase = mocks.into_usecase();
        usecase.handle_event(&body, "deadbeef").await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_event_replay_converges() {
        let active = subscription_fixture(SubscriptionStatus::Active);
        let mut cancelled = active.clone();
        cancelled.status = SubscriptionStatus::Cancelled.to_string();

        let body = serde_json::json!({
            "entity": "event",
            "event": "subscription.cancelled",
            "payload": {
                "subscription": { "entity": { "id": "sub_gateway_77", "status": "cancelled" } }
            }
        })
        .to_string()
        .into_bytes();

        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_verify_webhook_signature()
            .returning(|_, _| Ok(()));
        mocks
            .webhook_log_repo
            .expect_insert()
            .times(2)
            .returning(|_| Ok(Uuid::new_v4()));
        mocks
            .webhook_log_repo
            .expect_mark_processed()
            .times(2)
            .returning(|_| Ok(()));
        mocks
            .resolver_repo
            .expect_find_by_gateway_subscription_id()
            .returning(move |_| Ok(Some(active.clone())));
        // First delivery sees the active row, the replay sees the cancelled
        // one and no-ops.
        let mut first = true;
        mocks.subscription_repo.expect_find_by_id().returning(move |_| {
            if first {
                first = false;
                Ok(Some(subscription_fixture(SubscriptionStatus::Active)))
            } else {
                Ok(Some(cancelled.clone()))
            }
        });
        mocks
            .subscription_repo
            .expect_mark_cancelled()
            .times(1)
            .returning(|_, _| Ok(()));
        mocks.notifier.expect_notify().times(1).returning(|_| ());

        let usecase = mocks.into_usecase();
        usecase.handle_event(&body, "deadbeef").await.unwrap();
        usecase.handle_event(&body, "deadbeef").await.unwrap();
    }

    #[tokio::test]
    async fn activation_never_revives_a_failed_subscription() {
        let failed = subscription_fixture(SubscriptionStatus::Failed);
        let body = serde_json::json!({
            "entity": "event",
            "event": "subscription.activated",
            "payload": {
                "subscription": { "entity": { "id": "sub_gateway_77", "status": "active" } }
            }
        })
        .to_string()
        .into_bytes();

        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_verify_webhook_signature()
            .returning(|_, _| Ok(()));
        mocks
            .webhook_log_repo
            .expect_insert()
            .returning(|_| Ok(Uuid::new_v4()));
        mocks
            .webhook_log_repo
            .expect_mark_processed()
            .times(1)
            .returning(|_| Ok(()));
        mocks
            .resolver_repo
            .expect_find_by_gateway_subscription_id()
            .returning(move |_| Ok(Some(failed.clone())));
        mocks.subscription_repo.expect_update_status().times(0);
        mocks.notifier.expect_notify().times(0);

        let usecase = mocks.into_usecase();
        usecase.handle_event(&body, "deadbeef").await.unwrap();
    }
}
