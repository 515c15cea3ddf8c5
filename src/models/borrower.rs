//! Borrower (library member) model and related types

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{contains_ignore_case, Paging};

/// Registration numbers and borrower secrets are six ASCII digits
pub static SIX_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{6}$").unwrap());

/// Which rule put a borrower in the blocked state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Holds an overdue loan; lifted once nothing is overdue anymore
    Preventive,
    /// Returned a copy late; lifted the day after `until`
    Penalty { until: NaiveDate },
}

/// Borrower model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct Borrower {
    pub id: i32,
    pub registration: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub credential_hash: String,
    pub loan_limit: i32,
    pub loans_in_progress: i32,
    pub blocked: bool,
    pub block_started_on: Option<NaiveDate>,
    pub block_ends_on: Option<NaiveDate>,
    pub blocked_days_total: i32,
    pub active: bool,
    #[serde(skip_serializing)]
    pub version: i32,
}

impl Borrower {
    /// Current block, if any. A block carrying an end date is a penalty block.
    pub fn block_kind(&self) -> Option<BlockKind> {
        if !self.blocked {
            return None;
        }
        Some(match self.block_ends_on {
            Some(until) => BlockKind::Penalty { until },
            None => BlockKind::Preventive,
        })
    }

    pub fn has_reached_limit(&self) -> bool {
        self.loans_in_progress >= self.loan_limit
    }
}

/// Borrower insertion payload, credential already hashed
#[derive(Debug, Clone)]
pub struct NewBorrower {
    pub registration: String,
    pub name: String,
    pub email: String,
    pub credential_hash: String,
    pub loan_limit: i32,
}

/// Register borrower request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBorrower {
    #[validate(length(min = 3, max = 50, message = "Name must be between 3 and 50 characters"))]
    pub name: String,
    #[validate(regex(path = *SIX_DIGITS, message = "Registration must be exactly 6 digits"))]
    pub registration: String,
    #[validate(email(message = "Invalid email format"), length(max = 100))]
    pub email: String,
    #[validate(regex(path = *SIX_DIGITS, message = "Secret must be exactly 6 digits"))]
    pub secret: String,
    /// Defaults to the configured loan limit
    #[validate(range(min = 0, max = 50, message = "Loan limit must be between 0 and 50"))]
    pub loan_limit: Option<i32>,
}

/// Update borrower request; absent fields keep their current value
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBorrower {
    #[validate(length(min = 3, max = 50, message = "Name must be between 3 and 50 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"), length(max = 100))]
    pub email: Option<String>,
    #[validate(range(min = 0, max = 50, message = "Loan limit must be between 0 and 50"))]
    pub loan_limit: Option<i32>,
}

/// Borrower query parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct BorrowerQuery {
    /// Part of the name, any case
    pub name: Option<String>,
    pub registration: Option<String>,
    /// Whole email address, any case
    pub email: Option<String>,
    pub active: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl BorrowerQuery {
    pub fn paging(&self) -> Paging {
        Paging::new(self.page, self.per_page)
    }

    pub fn matches(&self, borrower: &Borrower) -> bool {
        self.name.as_deref().map_or(true, |n| contains_ignore_case(&borrower.name, n))
            && self.registration.as_deref().map_or(true, |r| borrower.registration == r)
            && self.email.as_deref().map_or(true, |e| borrower.email.eq_ignore_ascii_case(e))
            && self.active.map_or(true, |a| borrower.active == a)
    }
}

/// One page of borrowers
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowerPage {
    pub items: Vec<Borrower>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}
