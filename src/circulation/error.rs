//! Outcome taxonomy of circulation requests

use chrono::NaiveDate;
use thiserror::Error;

use super::ports::StoreError;

/// Entity a request referred to that does not exist, named the way the request named it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Missing {
    #[error("borrower {0} not found")]
    Borrower(String),

    #[error("book {0} not found")]
    Book(String),

    #[error("loan {0} not found")]
    Loan(i32),
}

/// Eligibility rule that refused a request. The display text is the reason reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("borrower is inactive")]
    BorrowerInactive,

    #[error("borrower temporarily blocked until {until}")]
    TemporarilyBlocked { until: NaiveDate },

    #[error("borrower holds overdue loans and is blocked until they are returned")]
    OverdueLoansOutstanding,

    #[error("borrower already holds an active loan of this book")]
    AlreadyBorrowed,

    #[error("loan limit reached ({limit})")]
    LoanLimitReached { limit: i32 },

    #[error("book unavailable")]
    BookUnavailable,

    #[error("loan already returned")]
    AlreadyReturned,

    #[error("renewal limit reached ({limit})")]
    RenewalLimitReached { limit: i32 },

    #[error("renewal not allowed after due date passed")]
    RenewalAfterDueDate,
}

/// Why a borrow, renewal or return did not happen
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CirculationError {
    #[error("{0}")]
    NotFound(Missing),

    #[error("{0}")]
    Denied(#[from] Denial),

    #[error("incorrect credential")]
    IncorrectCredential,

    /// Another transition changed the loaded state first
    #[error("concurrent modification: {0}")]
    Conflict(String),

    #[error("failed to persist changes")]
    Persistence(String),
}

impl CirculationError {
    pub fn denial(&self) -> Option<&Denial> {
        match self {
            CirculationError::Denied(d) => Some(d),
            _ => None,
        }
    }
}

impl From<StoreError> for CirculationError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => CirculationError::Conflict(msg),
            StoreError::Backend(msg) => CirculationError::Persistence(msg),
        }
    }
}

pub type CirculationResult<T> = Result<T, CirculationError>;
