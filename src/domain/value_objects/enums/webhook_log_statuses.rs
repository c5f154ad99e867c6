use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WebhookLogStatus {
    Processing,
    Processed,
    Failed,
}

impl Display for WebhookLogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            WebhookLogStatus::Processing => "processing",
            WebhookLogStatus::Processed => "processed",
            WebhookLogStatus::Failed => "failed",
        };
        write!(f, "{}", status)
    }
}
