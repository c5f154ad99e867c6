use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};
use url::Url;

use billing_cycle::application::gateway::PaymentGateway;
use billing_cycle::application::notifications::{
    NotificationProvider, NotificationSink, Notifier,
};
use billing_cycle::application::usecases::{
    gateway_webhook::GatewayWebhookUseCase,
    lifecycle::{BillingPolicy, SubscriptionLifecycleUseCase},
    renewals::RenewalUseCase,
    trial_eligibility::TrialEligibilityUseCase,
};
use billing_cycle::axum_http::http_serve;
use billing_cycle::config::config_loader;
use billing_cycle::domain::repositories::{
    payments::PaymentRepository, products::ProductRepository,
    subscriptions::SubscriptionRepository, trial_history::TrialHistoryRepository,
    webhook_logs::WebhookLogRepository,
};
use billing_cycle::infrastructure::notifications::lifecycle_webhook::LifecycleWebhookProvider;
use billing_cycle::infrastructure::payments::razorpay_client::RazorpayClient;
use billing_cycle::infrastructure::postgres::{
    postgres_connection,
    repositories::{
        payments::PaymentPostgres, products::ProductPostgres,
        subscriptions::SubscriptionPostgres, trial_history::TrialHistoryPostgres,
        webhook_logs::WebhookLogPostgres,
    },
};
use billing_cycle::observability;
use billing_cycle::scheduler::worker_loop;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Service exited with error: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    observability::init_observability("billing-cycle")?;

    let dotenvy_env = Arc::new(config_loader::load()?);
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);

    let subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync> =
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool_arc)));
    let product_repo: Arc<dyn ProductRepository + Send + Sync> =
        Arc::new(ProductPostgres::new(Arc::clone(&db_pool_arc)));
    let payment_repo: Arc<dyn PaymentRepository + Send + Sync> =
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool_arc)));
    let trial_history_repo: Arc<dyn TrialHistoryRepository + Send + Sync> =
        Arc::new(TrialHistoryPostgres::new(Arc::clone(&db_pool_arc)));
    let webhook_log_repo: Arc<dyn WebhookLogRepository + Send + Sync> =
        Arc::new(WebhookLogPostgres::new(Arc::clone(&db_pool_arc)));

    let gateway: Arc<dyn PaymentGateway> = Arc::new(RazorpayClient::new(
        dotenvy_env.razorpay.key_id.clone(),
        dotenvy_env.razorpay.key_secret.clone(),
        dotenvy_env.razorpay.webhook_secret.clone(),
        dotenvy_env.razorpay.currency.clone(),
    ));

    let mut providers: Vec<Arc<dyn NotificationProvider>> = Vec::new();
    if let Some(webhook_url) = dotenvy_env.notifications.lifecycle_webhook_url.as_deref() {
        let webhook_url = Url::parse(webhook_url)?;
        providers.push(Arc::new(LifecycleWebhookProvider::new(webhook_url)));
        info!("Lifecycle notifications enabled");
    } else {
        info!("Lifecycle notifications disabled");
    }
    let notifier: Arc<dyn NotificationSink> = Arc::new(Notifier::new(providers));

    let billing = &dotenvy_env.billing;
    let policy = BillingPolicy {
        max_payment_retries: billing.max_payment_retries,
        retry_interval_days: billing.retry_interval_days,
        auto_cancel_on_exhaustion: billing.auto_cancel_on_exhaustion,
        failed_grace_days: billing.failed_grace_days,
        overdue_grace_hours: billing.overdue_grace_hours,
        trial_reminder_days: billing.trial_reminder_days,
        charge_throttle_ms: billing.charge_throttle_ms,
    };

    let lifecycle = Arc::new(SubscriptionLifecycleUseCase::new(
        Arc::clone(&subscription_repo),
        Arc::clone(&product_repo),
        Arc::clone(&payment_repo),
        Arc::clone(&trial_history_repo),
        Arc::clone(&notifier),
        policy.clone(),
    ));

    let trials = Arc::new(TrialEligibilityUseCase::new(
        Arc::clone(&product_repo),
        Arc::clone(&subscription_repo),
        Arc::clone(&trial_history_repo),
    ));

    let webhook_usecase = Arc::new(GatewayWebhookUseCase::new(
        Arc::clone(&gateway),
        Arc::clone(&webhook_log_repo),
        Arc::clone(&subscription_repo),
        Arc::clone(&lifecycle),
    ));

    let renewals = Arc::new(RenewalUseCase::new(
        Arc::clone(&subscription_repo),
        Arc::clone(&gateway),
        Arc::clone(&lifecycle),
        Arc::clone(&notifier),
        policy,
    ));

    info!("Service started");

    let renewal_loop = tokio::spawn(worker_loop::run_renewal_loop(
        Arc::clone(&renewals),
        dotenvy_env.scheduler.renewal_sweep_secs,
    ));

    let retry_loop = tokio::spawn(worker_loop::run_retry_loop(
        renewals,
        dotenvy_env.scheduler.retry_sweep_secs,
    ));

    let http_server = tokio::spawn(http_serve::start(
        Arc::clone(&dotenvy_env),
        lifecycle,
        trials,
        webhook_usecase,
    ));

    tokio::select! {
        result = renewal_loop => result??,
        result = retry_loop => result??,
        result = http_server => result??,
    };

    Ok(())
}
