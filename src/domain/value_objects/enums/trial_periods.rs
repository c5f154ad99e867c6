use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TrialPeriod {
    Day,
    Week,
    Month,
}

impl Display for TrialPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let period = match self {
            TrialPeriod::Day => "day",
            TrialPeriod::Week => "week",
            TrialPeriod::Month => "month",
        };
        write!(f, "{}", period)
    }
}

impl TrialPeriod {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "day" => Some(TrialPeriod::Day),
            "week" => Some(TrialPeriod::Week),
            "month" => Some(TrialPeriod::Month),
            _ => None,
        }
    }

    /// Day multiplier for one period unit. Months are 30 days by convention.
    pub fn day_multiplier(&self) -> i64 {
        match self {
            TrialPeriod::Day => 1,
            TrialPeriod::Week => 7,
            TrialPeriod::Month => 30,
        }
    }

    pub fn to_days(&self, duration: i32) -> i64 {
        i64::from(duration.max(0)) * self.day_multiplier()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_day_conversion() {
        assert_eq!(TrialPeriod::Week.to_days(2), 14);
        assert_eq!(TrialPeriod::Month.to_days(1), 30);
        assert_eq!(TrialPeriod::Day.to_days(5), 5);
    }

    #[test]
    fn negative_duration_clamps_to_zero() {
        assert_eq!(TrialPeriod::Week.to_days(-3), 0);
    }
}
