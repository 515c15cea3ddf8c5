//! Borrowers repository for database operations

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use super::loans::LOAN_COLUMNS;
use crate::{
    circulation::{BorrowerRepository, StoreResult},
    models::{Borrower, BorrowerQuery, Loan, NewBorrower},
};

pub(crate) const BORROWER_COLUMNS: &str = "id, registration, name, email, credential_hash, loan_limit, \
     loans_in_progress, blocked, block_started_on, block_ends_on, blocked_days_total, active, version";

const SEARCH_FILTER: &str = r#"
    ($1::TEXT IS NULL OR LOWER(name) LIKE '%' || LOWER($1) || '%')
    AND ($2::TEXT IS NULL OR registration = $2)
    AND ($3::TEXT IS NULL OR LOWER(email) = LOWER($3))
    AND ($4::BOOLEAN IS NULL OR active = $4)
"#;

#[derive(Clone)]
pub struct BorrowersRepository {
    pool: Pool<Postgres>,
}

impl BorrowersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BorrowerRepository for BorrowersRepository {
    /// Get borrower by ID
    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Borrower>> {
        let borrower = sqlx::query_as::<_, Borrower>(&format!("SELECT {} FROM borrowers WHERE id = $1", BORROWER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(borrower)
    }

    /// Get borrower by registration number
    async fn find_by_registration(&self, registration: &str) -> StoreResult<Option<Borrower>> {
        let borrower = sqlx::query_as::<_, Borrower>(&format!(
            "SELECT {} FROM borrowers WHERE registration = $1",
            BORROWER_COLUMNS
        ))
        .bind(registration)
        .fetch_optional(&self.pool)
        .await?;
        Ok(borrower)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Borrower>> {
        let borrower = sqlx::query_as::<_, Borrower>(&format!(
            "SELECT {} FROM borrowers WHERE LOWER(email) = LOWER($1)",
            BORROWER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(borrower)
    }

    async fn find_active_overdue_loan(&self, borrower_id: i32, today: NaiveDate) -> StoreResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            r#"
            SELECT {} FROM loans
            WHERE borrower_id = $1
              AND status IN ('loaned', 'renewed')
              AND due_on < $2
            ORDER BY due_on
            LIMIT 1
            "#,
            LOAN_COLUMNS
        ))
        .bind(borrower_id)
        .bind(today)
        .fetch_optional(&self.pool)
        .await?;
        Ok(loan)
    }

    /// Search borrowers with pagination
    async fn search(&self, query: &BorrowerQuery) -> StoreResult<(Vec<Borrower>, i64)> {
        let paging = query.paging();

        let count_query = format!("SELECT COUNT(*) FROM borrowers WHERE {}", SEARCH_FILTER);
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(&query.name)
            .bind(&query.registration)
            .bind(&query.email)
            .bind(query.active)
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            "SELECT {} FROM borrowers WHERE {} ORDER BY name, id LIMIT $5 OFFSET $6",
            BORROWER_COLUMNS, SEARCH_FILTER
        );
        let borrowers = sqlx::query_as::<_, Borrower>(&select_query)
            .bind(&query.name)
            .bind(&query.registration)
            .bind(&query.email)
            .bind(query.active)
            .bind(paging.per_page)
            .bind(paging.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((borrowers, total))
    }

    /// Create a new borrower
    async fn insert(&self, borrower: NewBorrower) -> StoreResult<Borrower> {
        let created = sqlx::query_as::<_, Borrower>(&format!(
            r#"
            INSERT INTO borrowers (registration, name, email, credential_hash, loan_limit)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            BORROWER_COLUMNS
        ))
        .bind(&borrower.registration)
        .bind(&borrower.name)
        .bind(&borrower.email)
        .bind(&borrower.credential_hash)
        .bind(borrower.loan_limit)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }
}
