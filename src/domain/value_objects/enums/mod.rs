pub mod billing_intervals;
pub mod payment_statuses;
pub mod subscription_statuses;
pub mod trial_periods;
pub mod trial_statuses;
pub mod webhook_log_statuses;
