pub mod gateway_webhook;
pub mod subscriptions;
