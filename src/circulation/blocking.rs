//! Borrower blocking: when a block is applied, and when it is lifted.
//!
//! Two rules share the borrower `blocked` flag:
//!
//! * a **preventive** block is applied when a borrow or renewal finds an overdue
//!   active loan, and lifted as soon as nothing of theirs is overdue anymore;
//! * a **penalty** block is applied when a copy comes back late. It lasts as many
//!   days as the copy was late and is lifted once its end date has passed.
//!
//! The functions here only touch the in-memory borrower; persisting the change is
//! up to the caller.

use chrono::{Duration, NaiveDate};

use super::error::Denial;
use crate::models::{BlockKind, Borrower};

/// Lifts the block if its reason is gone. Returns true when a block was lifted.
pub fn refresh(borrower: &mut Borrower, today: NaiveDate, holds_overdue_loan: bool) -> bool {
    let expired = match borrower.block_kind() {
        None => false,
        Some(BlockKind::Penalty { until }) => today > until,
        Some(BlockKind::Preventive) => !holds_overdue_loan,
    };
    if expired {
        lift(borrower);
    }
    expired
}

/// Gate run at the start of a borrow or renewal.
///
/// Self-heals stale blocks first, then refuses a borrower who is still blocked or who
/// holds an overdue loan. In the latter case the preventive block is applied before
/// refusing.
pub fn screen(borrower: &mut Borrower, today: NaiveDate, holds_overdue_loan: bool) -> Result<(), Denial> {
    refresh(borrower, today, holds_overdue_loan);

    match borrower.block_kind() {
        Some(BlockKind::Penalty { until }) => return Err(Denial::TemporarilyBlocked { until }),
        Some(BlockKind::Preventive) => return Err(Denial::OverdueLoansOutstanding),
        None => {}
    }

    if holds_overdue_loan {
        apply_preventive(borrower, today);
        return Err(Denial::OverdueLoansOutstanding);
    }

    Ok(())
}

pub fn apply_preventive(borrower: &mut Borrower, today: NaiveDate) {
    if borrower.blocked {
        return;
    }
    borrower.blocked = true;
    borrower.block_started_on = Some(today);
    borrower.block_ends_on = None;
}

/// Blocks the borrower for `days_late` days counted from `returned_on`.
/// An existing penalty that ends later is kept.
pub fn apply_penalty(borrower: &mut Borrower, returned_on: NaiveDate, days_late: i64) {
    if days_late <= 0 {
        return;
    }
    let until = returned_on + Duration::days(days_late);
    let extends = !matches!(
        borrower.block_kind(),
        Some(BlockKind::Penalty { until: current }) if current >= until
    );

    // The start date belongs to whichever penalty decides the end date
    if extends {
        borrower.blocked = true;
        borrower.block_started_on = Some(returned_on);
        borrower.block_ends_on = Some(until);
    }
    borrower.blocked_days_total += days_late as i32;
}

/// Re-evaluation run once a return has been applied. `others_overdue` tells whether
/// any other active loan of the borrower is still overdue.
pub fn after_return(borrower: &mut Borrower, today: NaiveDate, others_overdue: bool) {
    refresh(borrower, today, others_overdue);
}

fn lift(borrower: &mut Borrower) {
    borrower.blocked = false;
    borrower.block_started_on = None;
    borrower.block_ends_on = None;
}
