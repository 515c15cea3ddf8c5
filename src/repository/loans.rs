//! Loans repository for database operations

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    circulation::{LoanRepository, StoreResult},
    models::{Loan, LoanQuery},
};

pub(crate) const LOAN_COLUMNS: &str =
    "id, borrower_id, book_id, loaned_on, due_on, returned_on, status, renewal_count, renewal_limit, version";

/// Shared WHERE clause of loan searches; $1..$5 bind the query filters
const SEARCH_FILTER: &str = r#"
    ($1::INTEGER IS NULL OR borrower_id = $1)
    AND ($2::INTEGER IS NULL OR book_id = $2)
    AND ($3::loan_status IS NULL OR status = $3)
    AND (NOT $4 OR (status IN ('loaned', 'renewed') AND due_on < $5))
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanRepository for LoansRepository {
    /// Get loan by ID
    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(&format!("SELECT {} FROM loans WHERE id = $1", LOAN_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(loan)
    }

    async fn find_active_loan_of(&self, borrower_id: i32, book_id: i32) -> StoreResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            r#"
            SELECT {} FROM loans
            WHERE borrower_id = $1 AND book_id = $2 AND status IN ('loaned', 'renewed')
            "#,
            LOAN_COLUMNS
        ))
        .bind(borrower_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(loan)
    }

    async fn active_loans_of(&self, borrower_id: i32) -> StoreResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            r#"
            SELECT {} FROM loans
            WHERE borrower_id = $1 AND status IN ('loaned', 'renewed')
            ORDER BY due_on
            "#,
            LOAN_COLUMNS
        ))
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    /// Every loan of a borrower, newest first
    async fn history_of_borrower(&self, borrower_id: i32) -> StoreResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE borrower_id = $1 ORDER BY id DESC",
            LOAN_COLUMNS
        ))
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    /// Every loan of a book, newest first
    async fn history_of_book(&self, book_id: i32) -> StoreResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE book_id = $1 ORDER BY id DESC",
            LOAN_COLUMNS
        ))
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    async fn search(&self, query: &LoanQuery, today: NaiveDate) -> StoreResult<(Vec<Loan>, i64)> {
        let overdue_only = query.overdue.unwrap_or(false);
        let paging = query.paging();

        let count_query = format!("SELECT COUNT(*) FROM loans WHERE {}", SEARCH_FILTER);
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(query.borrower_id)
            .bind(query.book_id)
            .bind(query.status)
            .bind(overdue_only)
            .bind(today)
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            "SELECT {} FROM loans WHERE {} ORDER BY id DESC LIMIT $6 OFFSET $7",
            LOAN_COLUMNS, SEARCH_FILTER
        );
        let loans = sqlx::query_as::<_, Loan>(&select_query)
            .bind(query.borrower_id)
            .bind(query.book_id)
            .bind(query.status)
            .bind(overdue_only)
            .bind(today)
            .bind(paging.per_page)
            .bind(paging.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((loans, total))
    }

    /// Count active loans
    async fn count_active(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE status IN ('loaned', 'renewed')")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Count overdue loans
    async fn count_overdue(&self, today: NaiveDate) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE status IN ('loaned', 'renewed') AND due_on < $1",
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
