//! Accept/deny decisions for borrow, renewal and return.
//!
//! Checks run in a fixed order: existence of the referenced records, then the
//! borrower and book rules, then the credential. The first failing check decides.
//! The only state these functions change is the borrower's block standing (see
//! [`blocking::screen`]), which the caller persists whatever the outcome.

use chrono::NaiveDate;

use super::{
    blocking,
    error::{CirculationError, CirculationResult, Denial, Missing},
    policy::RenewalPolicy,
    ports::CredentialCheck,
};
use crate::models::{Book, Borrower, Loan};

/// Facts about the borrower's loans, loaded before checking a borrow
#[derive(Debug, Clone, Copy, Default)]
pub struct BorrowFacts {
    pub holds_overdue_loan: bool,
    pub holds_same_book: bool,
}

/// `borrower` and `book` carry the lookup result; a missing record is only
/// reported once every check before it has passed.
pub fn can_borrow<F>(
    borrower: Result<&mut Borrower, Missing>,
    book: Result<&Book, Missing>,
    facts: BorrowFacts,
    today: NaiveDate,
    verify: F,
) -> CirculationResult<()>
where
    F: FnOnce(&Borrower) -> CredentialCheck,
{
    let borrower = borrower.map_err(CirculationError::NotFound)?;
    if !borrower.active {
        return Err(Denial::BorrowerInactive.into());
    }

    blocking::screen(borrower, today, facts.holds_overdue_loan)?;

    if facts.holds_same_book {
        return Err(Denial::AlreadyBorrowed.into());
    }
    if borrower.has_reached_limit() {
        return Err(Denial::LoanLimitReached { limit: borrower.loan_limit }.into());
    }

    let book = book.map_err(CirculationError::NotFound)?;
    if !book.is_available() {
        return Err(Denial::BookUnavailable.into());
    }

    credential(verify(borrower))
}

/// `loan` must be the loan the borrower was resolved from
pub fn can_renew<F>(
    loan: &Loan,
    borrower: &mut Borrower,
    holds_overdue_loan: bool,
    renewal: RenewalPolicy,
    today: NaiveDate,
    verify: F,
) -> CirculationResult<()>
where
    F: FnOnce(&Borrower) -> CredentialCheck,
{
    if loan.status.is_terminal() {
        return Err(Denial::AlreadyReturned.into());
    }

    match renewal {
        RenewalPolicy::FixedCap { max_renewals } => {
            let limit = loan.renewal_limit.unwrap_or(max_renewals);
            if loan.renewal_count >= limit {
                return Err(Denial::RenewalLimitReached { limit }.into());
            }
        }
        RenewalPolicy::DueDateOnly => {
            if today > loan.due_on {
                return Err(Denial::RenewalAfterDueDate.into());
            }
        }
    }

    blocking::screen(borrower, today, holds_overdue_loan)?;

    credential(verify(borrower))
}

pub fn can_return<F>(loan: &Loan, borrower: &Borrower, verify: F) -> CirculationResult<()>
where
    F: FnOnce(&Borrower) -> CredentialCheck,
{
    if loan.status.is_terminal() {
        return Err(Denial::AlreadyReturned.into());
    }

    credential(verify(borrower))
}

fn credential(check: CredentialCheck) -> CirculationResult<()> {
    match check {
        CredentialCheck::Match => Ok(()),
        CredentialCheck::Mismatch => Err(CirculationError::IncorrectCredential),
    }
}
