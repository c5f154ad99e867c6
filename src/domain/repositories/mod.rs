pub mod payments;
pub mod products;
pub mod subscriptions;
pub mod trial_history;
pub mod webhook_logs;
