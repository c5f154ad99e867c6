use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TrialStatus {
    Active,
    Converted,
    Cancelled,
}

impl Display for TrialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            TrialStatus::Active => "active",
            TrialStatus::Converted => "converted",
            TrialStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", status)
    }
}
