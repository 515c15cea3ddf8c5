//! Loan management service

use std::future::Future;

use crate::{
    circulation::{BorrowRequest, CirculationError, CirculationResult, LoanEngine, Missing, Stores},
    error::{AppError, AppResult},
    models::{
        loan::{LoanCounts, LoanPage},
        Loan, LoanQuery,
    },
};

#[derive(Clone)]
pub struct LoansService {
    engine: LoanEngine,
    stores: Stores,
}

impl LoansService {
    pub fn new(engine: LoanEngine, stores: Stores) -> Self {
        Self { engine, stores }
    }

    /// Borrow a book
    pub async fn borrow(&self, request: BorrowRequest) -> AppResult<Loan> {
        self.with_conflict_retry(|| self.engine.borrow(&request)).await
    }

    /// Renew a loan
    pub async fn renew(&self, loan_id: i32, secret: &str) -> AppResult<Loan> {
        self.with_conflict_retry(|| self.engine.renew(loan_id, secret)).await
    }

    /// Return a borrowed book
    pub async fn return_loan(&self, loan_id: i32, secret: &str) -> AppResult<Loan> {
        self.with_conflict_retry(|| self.engine.return_loan(loan_id, secret)).await
    }

    /// Runs a transition again from a fresh load after it lost a race, at most
    /// `conflict_retries` times.
    async fn with_conflict_retry<F, Fut>(&self, attempt: F) -> AppResult<Loan>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = CirculationResult<Loan>>,
    {
        let retries = self.engine.policy().conflict_retries;
        let mut retried = 0;
        loop {
            match attempt().await {
                Err(CirculationError::Conflict(detail)) if retried < retries => {
                    retried += 1;
                    tracing::info!(retry = retried, detail = %detail, "Retrying circulation request");
                }
                outcome => return outcome.map_err(AppError::from),
            }
        }
    }

    /// Get loan by ID
    pub async fn get_loan(&self, loan_id: i32) -> AppResult<Loan> {
        self.stores
            .loans
            .find_by_id(loan_id)
            .await?
            .ok_or_else(|| CirculationError::NotFound(Missing::Loan(loan_id)).into())
    }

    /// Get every loan of a borrower, newest first
    pub async fn get_borrower_loans(&self, borrower_id: i32) -> AppResult<Vec<Loan>> {
        // Verify borrower exists
        if self.stores.borrowers.find_by_id(borrower_id).await?.is_none() {
            return Err(CirculationError::NotFound(Missing::Borrower(borrower_id.to_string())).into());
        }
        Ok(self.stores.loans.history_of_borrower(borrower_id).await?)
    }

    /// Get every loan of a book, newest first
    pub async fn get_book_loans(&self, book_id: i32) -> AppResult<Vec<Loan>> {
        // Verify book exists
        if self.stores.books.find_by_id(book_id).await?.is_none() {
            return Err(CirculationError::NotFound(Missing::Book(book_id.to_string())).into());
        }
        Ok(self.stores.loans.history_of_book(book_id).await?)
    }

    /// Search loans with pagination
    pub async fn search(&self, query: &LoanQuery) -> AppResult<LoanPage> {
        let (items, total) = self.stores.loans.search(query, self.engine.today()).await?;
        let paging = query.paging();
        Ok(LoanPage {
            items,
            total,
            page: paging.page,
            per_page: paging.per_page,
        })
    }

    /// Count active and overdue loans
    pub async fn counts(&self) -> AppResult<LoanCounts> {
        let active = self.stores.loans.count_active().await?;
        let overdue = self.stores.loans.count_overdue(self.engine.today()).await?;
        Ok(LoanCounts { active, overdue })
    }
}
