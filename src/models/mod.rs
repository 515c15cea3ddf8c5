//! Data models for the circulation server

pub mod book;
pub mod borrower;
pub mod loan;

// Re-export commonly used types
pub use book::{Book, BookDetails, BookPage, BookQuery, BookStatus, NewBook};
pub use borrower::{BlockKind, Borrower, BorrowerPage, BorrowerQuery, NewBorrower};
pub use loan::{Loan, LoanQuery, LoanStatus};

/// Page selection shared by the search queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: i64,
    pub per_page: i64,
}

impl Paging {
    pub const DEFAULT_PER_PAGE: i64 = 10;
    pub const MAX_PER_PAGE: i64 = 100;

    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(Self::DEFAULT_PER_PAGE)
                .clamp(1, Self::MAX_PER_PAGE),
        }
    }

    /// Rows to skip; saturates instead of overflowing on absurd page numbers
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Applies this page to rows already filtered and ordered in memory
    pub fn slice<T>(&self, rows: impl Iterator<Item = T>) -> Vec<T> {
        rows.skip(usize::try_from(self.offset()).unwrap_or(usize::MAX))
            .take(self.per_page as usize)
            .collect()
    }
}

/// Case-insensitive substring match used by the in-memory searches
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
