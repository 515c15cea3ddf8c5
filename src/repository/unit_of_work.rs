//! Atomic commit of a change set inside one PostgreSQL transaction

use async_trait::async_trait;
use sqlx::{postgres::PgQueryResult, Pool, Postgres};

use crate::{
    circulation::{ChangeSet, CommitReceipt, StoreError, StoreResult, UnitOfWork},
    models::{Book, Borrower, Loan},
};

#[derive(Clone)]
pub struct PgUnitOfWork {
    pool: Pool<Postgres>,
}

impl PgUnitOfWork {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// A versioned update that touched no row lost against a concurrent writer
fn expect_one_row(result: PgQueryResult, entity: &str, id: i32) -> StoreResult<()> {
    if result.rows_affected() == 0 {
        return Err(StoreError::Conflict(format!("{} {} changed since it was loaded", entity, id)));
    }
    Ok(())
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(&self, changes: ChangeSet) -> StoreResult<CommitReceipt> {
        // dropped without commit on any early return, which rolls back
        let mut tx = self.pool.begin().await?;

        for book in &changes.books {
            let result = update_book(book).execute(&mut *tx).await?;
            expect_one_row(result, "book", book.id)?;
        }

        for borrower in &changes.borrowers {
            let result = update_borrower(borrower).execute(&mut *tx).await?;
            expect_one_row(result, "borrower", borrower.id)?;
        }

        for loan in &changes.loans {
            let result = update_loan(loan).execute(&mut *tx).await?;
            expect_one_row(result, "loan", loan.id)?;
        }

        for book in &changes.deleted_books {
            let result = sqlx::query("DELETE FROM books WHERE id = $1 AND version = $2")
                .bind(book.id)
                .bind(book.version)
                .execute(&mut *tx)
                .await?;
            expect_one_row(result, "book", book.id)?;
        }

        let mut receipt = CommitReceipt::default();
        for loan in &changes.new_loans {
            let id: i32 = sqlx::query_scalar(
                r#"
                INSERT INTO loans (borrower_id, book_id, loaned_on, due_on, returned_on,
                                   status, renewal_count, renewal_limit)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id
                "#,
            )
            .bind(loan.borrower_id)
            .bind(loan.book_id)
            .bind(loan.loaned_on)
            .bind(loan.due_on)
            .bind(loan.returned_on)
            .bind(loan.status)
            .bind(loan.renewal_count)
            .bind(loan.renewal_limit)
            .fetch_one(&mut *tx)
            .await?;
            receipt.inserted_loan_ids.push(id);
        }

        tx.commit().await?;
        Ok(receipt)
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>;

fn update_book(book: &Book) -> PgQuery<'_> {
    sqlx::query(
        r#"
        UPDATE books
        SET title = $1, author = $2, edition = $3, publisher = $4, category = $5,
            publication_year = $6, stock = $7, available = $8,
            version = version + 1, updated_at = NOW()
        WHERE id = $9 AND version = $10
        "#,
    )
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.edition)
    .bind(&book.publisher)
    .bind(&book.category)
    .bind(book.publication_year)
    .bind(book.stock)
    .bind(book.available)
    .bind(book.id)
    .bind(book.version)
}

fn update_borrower(borrower: &Borrower) -> PgQuery<'_> {
    sqlx::query(
        r#"
        UPDATE borrowers
        SET name = $1, email = $2, loan_limit = $3, loans_in_progress = $4, blocked = $5,
            block_started_on = $6, block_ends_on = $7, blocked_days_total = $8, active = $9,
            version = version + 1, updated_at = NOW()
        WHERE id = $10 AND version = $11
        "#,
    )
    .bind(&borrower.name)
    .bind(&borrower.email)
    .bind(borrower.loan_limit)
    .bind(borrower.loans_in_progress)
    .bind(borrower.blocked)
    .bind(borrower.block_started_on)
    .bind(borrower.block_ends_on)
    .bind(borrower.blocked_days_total)
    .bind(borrower.active)
    .bind(borrower.id)
    .bind(borrower.version)
}

fn update_loan(loan: &Loan) -> PgQuery<'_> {
    sqlx::query(
        r#"
        UPDATE loans
        SET loaned_on = $1, due_on = $2, returned_on = $3, status = $4, renewal_count = $5,
            version = version + 1, updated_at = NOW()
        WHERE id = $6 AND version = $7
        "#,
    )
    .bind(loan.loaned_on)
    .bind(loan.due_on)
    .bind(loan.returned_on)
    .bind(loan.status)
    .bind(loan.renewal_count)
    .bind(loan.id)
    .bind(loan.version)
}
