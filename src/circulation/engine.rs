//! Borrow, renew and return, each as one load → check → mutate → commit pass

use std::{fmt, sync::Arc};

use chrono::NaiveDate;

use super::{
    eligibility::{self, BorrowFacts},
    error::{CirculationError, CirculationResult, Missing},
    policy::CirculationPolicy,
    ports::{ChangeSet, Clock, CommitReceipt, CredentialVerifier, Notifier, Stores},
    transitions,
};
use crate::models::{Book, Borrower, Loan};

/// How a request names the borrower
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorrowerKey {
    Id(i32),
    Registration(String),
}

/// How a request names the book
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookKey {
    Id(i32),
    CatalogCode(String),
}

impl fmt::Display for BorrowerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BorrowerKey::Id(id) => write!(f, "{}", id),
            BorrowerKey::Registration(registration) => write!(f, "with registration {}", registration),
        }
    }
}

impl fmt::Display for BookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookKey::Id(id) => write!(f, "{}", id),
            BookKey::CatalogCode(code) => write!(f, "with catalog code {}", code),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BorrowRequest {
    pub borrower: BorrowerKey,
    pub book: BookKey,
    pub secret: String,
}

/// The loan lifecycle engine.
///
/// Nothing a transition changes is visible to anyone until its single commit
/// succeeds. Denials and failures come back as [`CirculationError`] and their
/// reason text is also handed to the [`Notifier`].
#[derive(Clone)]
pub struct LoanEngine {
    stores: Stores,
    credentials: Arc<dyn CredentialVerifier>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    policy: CirculationPolicy,
}

impl LoanEngine {
    pub fn new(
        stores: Stores,
        credentials: Arc<dyn CredentialVerifier>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        policy: CirculationPolicy,
    ) -> Self {
        Self {
            stores,
            credentials,
            notifier,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &CirculationPolicy {
        &self.policy
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Lend one copy of a book
    pub async fn borrow(&self, request: &BorrowRequest) -> CirculationResult<Loan> {
        let outcome = self.try_borrow(request).await;
        self.report(outcome)
    }

    /// Extend an active loan by a new loan period starting today
    pub async fn renew(&self, loan_id: i32, secret: &str) -> CirculationResult<Loan> {
        let outcome = self.try_renew(loan_id, secret).await;
        self.report(outcome)
    }

    /// Close an active loan and put the copy back on the shelf
    pub async fn return_loan(&self, loan_id: i32, secret: &str) -> CirculationResult<Loan> {
        let outcome = self.try_return(loan_id, secret).await;
        self.report(outcome)
    }

    async fn try_borrow(&self, request: &BorrowRequest) -> CirculationResult<Loan> {
        let today = self.clock.today();

        let mut borrower = self
            .load_borrower(&request.borrower)
            .await?
            .ok_or_else(|| Missing::Borrower(request.borrower.to_string()));
        let book = self
            .load_book(&request.book)
            .await?
            .ok_or_else(|| Missing::Book(request.book.to_string()));

        let mut facts = BorrowFacts::default();
        if let Ok(b) = &borrower {
            facts.holds_overdue_loan = self
                .stores
                .borrowers
                .find_active_overdue_loan(b.id, today)
                .await?
                .is_some();
            if let Ok(bk) = &book {
                facts.holds_same_book = self.stores.loans.find_active_loan_of(b.id, bk.id).await?.is_some();
            }
        }

        let loaded = borrower.clone();
        let checked = eligibility::can_borrow(
            borrower.as_mut().map_err(|m| m.clone()),
            book.as_ref().map_err(|m| m.clone()),
            facts,
            today,
            |b| self.credentials.verify(b, &request.secret),
        );
        if let Err(e) = checked {
            if let (Ok(before), Ok(after)) = (&loaded, &borrower) {
                self.persist_standing(before, after).await;
            }
            return Err(e);
        }

        let mut borrower = borrower.map_err(CirculationError::NotFound)?;
        let mut book = book.map_err(CirculationError::NotFound)?;

        let mut loan = transitions::borrow(&mut borrower, &mut book, &self.policy, today);

        let mut changes = ChangeSet::new();
        changes.update_book(&book);
        changes.update_borrower(&borrower);
        changes.insert_loan(loan.clone());

        let receipt = self.commit(changes).await?;
        loan.id = receipt
            .inserted_loan_ids
            .first()
            .copied()
            .ok_or_else(|| CirculationError::Persistence("no id assigned to the new loan".to_string()))?;

        tracing::info!(
            loan_id = loan.id,
            borrower_id = borrower.id,
            book_id = book.id,
            due_on = %loan.due_on,
            available = book.available,
            "Loan created"
        );

        Ok(loan)
    }

    async fn try_renew(&self, loan_id: i32, secret: &str) -> CirculationResult<Loan> {
        let today = self.clock.today();

        let mut loan = self
            .stores
            .loans
            .find_by_id(loan_id)
            .await?
            .ok_or(CirculationError::NotFound(Missing::Loan(loan_id)))?;
        let mut borrower = self
            .stores
            .borrowers
            .find_by_id(loan.borrower_id)
            .await?
            .ok_or_else(|| CirculationError::NotFound(Missing::Borrower(loan.borrower_id.to_string())))?;
        let holds_overdue_loan = self
            .stores
            .borrowers
            .find_active_overdue_loan(borrower.id, today)
            .await?
            .is_some();

        let loaded = borrower.clone();
        let checked = eligibility::can_renew(&loan, &mut borrower, holds_overdue_loan, self.policy.renewal, today, |b| {
            self.credentials.verify(b, secret)
        });
        if let Err(e) = checked {
            self.persist_standing(&loaded, &borrower).await;
            return Err(e);
        }

        transitions::renew(&mut loan, &self.policy, today);

        let mut changes = ChangeSet::new();
        changes.update_loan(&loan);
        if borrower != loaded {
            changes.update_borrower(&borrower);
        }

        self.commit(changes).await?;
        loan.version += 1;

        tracing::info!(
            loan_id = loan.id,
            renewal_count = loan.renewal_count,
            due_on = %loan.due_on,
            "Loan renewed"
        );

        Ok(loan)
    }

    async fn try_return(&self, loan_id: i32, secret: &str) -> CirculationResult<Loan> {
        let today = self.clock.today();

        let mut loan = self
            .stores
            .loans
            .find_by_id(loan_id)
            .await?
            .ok_or(CirculationError::NotFound(Missing::Loan(loan_id)))?;
        let mut borrower = self
            .stores
            .borrowers
            .find_by_id(loan.borrower_id)
            .await?
            .ok_or_else(|| CirculationError::NotFound(Missing::Borrower(loan.borrower_id.to_string())))?;
        let mut book = self
            .stores
            .books
            .find_by_id(loan.book_id)
            .await?
            .ok_or_else(|| CirculationError::NotFound(Missing::Book(loan.book_id.to_string())))?;
        let others_overdue = self
            .stores
            .loans
            .active_loans_of(borrower.id)
            .await?
            .iter()
            .any(|l| l.id != loan.id && l.is_overdue(today));

        eligibility::can_return(&loan, &borrower, |b| self.credentials.verify(b, secret))?;

        transitions::return_loan(&mut loan, &mut book, &mut borrower, &self.policy, today, others_overdue);

        let mut changes = ChangeSet::new();
        changes.update_book(&book);
        changes.update_borrower(&borrower);
        changes.update_loan(&loan);

        self.commit(changes).await?;
        loan.version += 1;

        tracing::info!(
            loan_id = loan.id,
            status = ?loan.status,
            borrower_blocked = borrower.blocked,
            available = book.available,
            "Loan returned"
        );

        Ok(loan)
    }

    async fn load_borrower(&self, key: &BorrowerKey) -> CirculationResult<Option<Borrower>> {
        let borrower = match key {
            BorrowerKey::Id(id) => self.stores.borrowers.find_by_id(*id).await?,
            BorrowerKey::Registration(r) => self.stores.borrowers.find_by_registration(r).await?,
        };
        Ok(borrower)
    }

    async fn load_book(&self, key: &BookKey) -> CirculationResult<Option<Book>> {
        let book = match key {
            BookKey::Id(id) => self.stores.books.find_by_id(*id).await?,
            BookKey::CatalogCode(code) => self.stores.books.find_by_catalog_code(code).await?,
        };
        Ok(book)
    }

    /// Stores a block or unblock decided while refusing a request. The refusal
    /// stands whether or not this write succeeds.
    async fn persist_standing(&self, before: &Borrower, after: &Borrower) {
        if before == after {
            return;
        }

        let mut changes = ChangeSet::new();
        changes.update_borrower(after);
        match self.stores.unit_of_work.commit(changes).await {
            Ok(_) => tracing::info!(borrower_id = after.id, blocked = after.blocked, "Borrower standing updated"),
            Err(e) => tracing::warn!(borrower_id = after.id, error = %e, "Failed to store borrower standing"),
        }
    }

    async fn commit(&self, changes: ChangeSet) -> CirculationResult<CommitReceipt> {
        Ok(self.stores.unit_of_work.commit(changes).await?)
    }

    fn report<T>(&self, outcome: CirculationResult<T>) -> CirculationResult<T> {
        if let Err(e) = &outcome {
            match e {
                CirculationError::Persistence(detail) => tracing::error!(detail = %detail, "Circulation commit failed"),
                CirculationError::Conflict(detail) => tracing::warn!(detail = %detail, "Circulation request lost a race"),
                _ => tracing::debug!(reason = %e, "Circulation request refused"),
            }
            self.notifier.report(&e.to_string());
        }
        outcome
    }
}
