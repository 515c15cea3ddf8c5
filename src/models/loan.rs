//! Loan model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::Paging;

/// Loan lifecycle status. Transitions only move forward:
/// `Loaned -> Renewed* -> Returned | ReturnedLate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "loan_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Loaned,
    Renewed,
    Returned,
    ReturnedLate,
}

impl LoanStatus {
    /// Loaned or renewed: counts against the borrower limit and book availability
    pub fn is_active(self) -> bool {
        matches!(self, LoanStatus::Loaned | LoanStatus::Renewed)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }
}

/// Loan model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub borrower_id: i32,
    pub book_id: i32,
    pub loaned_on: NaiveDate,
    pub due_on: NaiveDate,
    pub returned_on: Option<NaiveDate>,
    pub status: LoanStatus,
    pub renewal_count: i32,
    /// Only set under a fixed renewal cap
    pub renewal_limit: Option<i32>,
    #[serde(skip)]
    pub version: i32,
}

impl Loan {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_active() && today > self.due_on
    }

    /// Whole days past the due date on `day`, zero when on time
    pub fn days_late(&self, day: NaiveDate) -> i64 {
        (day - self.due_on).num_days().max(0)
    }
}

/// Loan search parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    pub borrower_id: Option<i32>,
    pub book_id: Option<i32>,
    pub status: Option<LoanStatus>,
    /// Only active loans past their due date
    pub overdue: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl LoanQuery {
    pub fn paging(&self) -> Paging {
        Paging::new(self.page, self.per_page)
    }

    /// Whether `loan` passes every filter of this query
    pub fn matches(&self, loan: &Loan, today: NaiveDate) -> bool {
        self.borrower_id.map_or(true, |id| loan.borrower_id == id)
            && self.book_id.map_or(true, |id| loan.book_id == id)
            && self.status.map_or(true, |s| loan.status == s)
            && (!self.overdue.unwrap_or(false) || loan.is_overdue(today))
    }
}

/// One page of loans
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanPage {
    pub items: Vec<Loan>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Active and overdue loan counters
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanCounts {
    pub active: i64,
    pub overdue: i64,
}
