pub mod enums;
pub mod gateway_events;
pub mod lifecycle_events;
pub mod subscriptions;
