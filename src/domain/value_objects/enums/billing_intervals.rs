use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BillingInterval {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl Display for BillingInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let interval = match self {
            BillingInterval::Weekly => "weekly",
            BillingInterval::Monthly => "monthly",
            BillingInterval::Yearly => "yearly",
        };
        write!(f, "{}", interval)
    }
}

impl BillingInterval {
    pub fn from_str(value: &str) -> Self {
        match value {
            "weekly" => BillingInterval::Weekly,
            "yearly" => BillingInterval::Yearly,
            _ => BillingInterval::Monthly,
        }
    }

    /// Calendar-approximate length of one billing cycle. Months count as 30
    /// days regardless of the actual month.
    pub fn days(&self) -> i64 {
        match self {
            BillingInterval::Weekly => 7,
            BillingInterval::Monthly => 30,
            BillingInterval::Yearly => 365,
        }
    }
}
