//! In-memory effects of the three loan transitions. Callers run the matching
//! eligibility check first; these functions assume it passed.

use chrono::NaiveDate;

use super::{
    blocking,
    policy::{CirculationPolicy, LateReturnPolicy},
};
use crate::models::{Book, Borrower, Loan, LoanStatus};

/// Takes one copy off the shelf for `borrower` and returns the new, not yet stored, loan
pub fn borrow(borrower: &mut Borrower, book: &mut Book, policy: &CirculationPolicy, today: NaiveDate) -> Loan {
    debug_assert!(book.available > 0);
    debug_assert!(borrower.loans_in_progress < borrower.loan_limit);

    book.available -= 1;
    borrower.loans_in_progress += 1;

    Loan {
        id: 0,
        borrower_id: borrower.id,
        book_id: book.id,
        loaned_on: today,
        due_on: policy.due_date_from(today),
        returned_on: None,
        status: LoanStatus::Loaned,
        renewal_count: 0,
        renewal_limit: policy.renewal_limit(),
        version: 0,
    }
}

/// Restarts the loan period from `today`
pub fn renew(loan: &mut Loan, policy: &CirculationPolicy, today: NaiveDate) {
    loan.loaned_on = today;
    loan.due_on = policy.due_date_from(today);
    loan.status = LoanStatus::Renewed;
    loan.renewal_count += 1;
}

/// Puts the copy back on the shelf and settles the borrower's standing.
///
/// `others_overdue` tells whether the borrower still holds another overdue loan
/// once this one is closed.
pub fn return_loan(
    loan: &mut Loan,
    book: &mut Book,
    borrower: &mut Borrower,
    policy: &CirculationPolicy,
    today: NaiveDate,
    others_overdue: bool,
) {
    let days_late = loan.days_late(today);

    debug_assert!(book.available < book.stock);
    debug_assert!(borrower.loans_in_progress > 0);

    book.available += 1;
    borrower.loans_in_progress -= 1;

    loan.returned_on = Some(today);
    loan.status = if days_late > 0 {
        LoanStatus::ReturnedLate
    } else {
        LoanStatus::Returned
    };

    blocking::after_return(borrower, today, others_overdue);
    if days_late > 0 && policy.late_return == LateReturnPolicy::Penalty {
        blocking::apply_penalty(borrower, today, days_late);
    }
}
