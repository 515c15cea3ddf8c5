//! Circulation rules chosen once when the engine is built

use chrono::{Duration, NaiveDate};
use serde::Deserialize;

/// How renewals are bounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RenewalPolicy {
    /// At most `max_renewals` renewals per loan
    FixedCap { max_renewals: i32 },
    /// Unlimited renewals, but never once the due date has passed
    DueDateOnly,
}

/// What a late return does to the borrower
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LateReturnPolicy {
    /// Only the preventive block applies; a late return carries no penalty
    PreventiveOnly,
    /// Block the borrower for as many days as the copy was late
    Penalty,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CirculationPolicy {
    pub loan_period_days: i64,
    pub default_loan_limit: i32,
    /// Fresh attempts the loans service makes after losing a concurrent update
    pub conflict_retries: u32,
    pub renewal: RenewalPolicy,
    pub late_return: LateReturnPolicy,
}

impl CirculationPolicy {
    pub fn due_date_from(&self, day: NaiveDate) -> NaiveDate {
        day + Duration::days(self.loan_period_days)
    }

    /// Renewal limit stamped on new loans
    pub fn renewal_limit(&self) -> Option<i32> {
        match self.renewal {
            RenewalPolicy::FixedCap { max_renewals } => Some(max_renewals),
            RenewalPolicy::DueDateOnly => None,
        }
    }
}

impl Default for CirculationPolicy {
    fn default() -> Self {
        Self {
            loan_period_days: 10,
            default_loan_limit: 3,
            conflict_retries: 1,
            renewal: RenewalPolicy::FixedCap { max_renewals: 5 },
            late_return: LateReturnPolicy::Penalty,
        }
    }
}
