pub mod lifecycle_webhook;
