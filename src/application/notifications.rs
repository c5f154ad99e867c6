use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

use crate::domain::value_objects::lifecycle_events::LifecycleEvent;

/// Delivery backend for lifecycle events (mail service bridge, ops webhook).
#[async_trait]
pub trait NotificationProvider: Send + Sync {
    async fn send(&self, event: &LifecycleEvent) -> Result<()>;
    fn provider_name(&self) -> &'static str;
}

/// What the use cases see. Emission is synchronous and infallible; delivery
/// failures stay inside the sink.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: LifecycleEvent);
}

#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<LifecycleEvent>,
}

impl Notifier {
    pub fn new(providers: Vec<Arc<dyn NotificationProvider>>) -> Self {
        let (tx, mut rx) = mpsc::channel::<LifecycleEvent>(256);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                for provider in &providers {
                    if let Err(error) = provider.send(&event).await {
                        warn!(
                            provider = provider.provider_name(),
                            subscription_id = %event.subscription_id(),
                            error = %error,
                            "Notification provider failed"
                        );
                    }
                }
            }
        });

        Self { tx }
    }
}

impl NotificationSink for Notifier {
    fn notify(&self, event: LifecycleEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Notification queue full; dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Notification queue closed; dropping event");
            }
        }
    }
}
