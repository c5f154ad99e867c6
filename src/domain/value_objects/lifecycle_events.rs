use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::enums::subscription_statuses::SubscriptionStatus;

/// Lifecycle events consumed by the notification sink. Fire-and-forget: a
/// failed delivery never rolls back the transition that produced the event.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Created {
        subscription_id: Uuid,
        user_id: Uuid,
        status: SubscriptionStatus,
    },
    StatusChanged {
        subscription_id: Uuid,
        old_status: SubscriptionStatus,
        new_status: SubscriptionStatus,
    },
    Renewed {
        subscription_id: Uuid,
        cycle: i32,
        amount_minor: i32,
    },
    PaymentFailed {
        subscription_id: Uuid,
        attempt: i32,
        max_attempts: i32,
    },
    TrialEndingSoon {
        subscription_id: Uuid,
        trial_ends_at: DateTime<Utc>,
    },
}

impl LifecycleEvent {
    pub fn subscription_id(&self) -> Uuid {
        match self {
            LifecycleEvent::Created {
                subscription_id, ..
            }
            | LifecycleEvent::StatusChanged {
                subscription_id, ..
            }
            | LifecycleEvent::Renewed {
                subscription_id, ..
            }
            | LifecycleEvent::PaymentFailed {
                subscription_id, ..
            }
            | LifecycleEvent::TrialEndingSoon {
                subscription_id, ..
            } => *subscription_id,
        }
    }
}
