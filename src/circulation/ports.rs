//! Collaborators the engine is built on: storage, unit of work, credentials, notification and time

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate};
use thiserror::Error;

use crate::models::{Book, BookQuery, Borrower, BorrowerQuery, Loan, LoanQuery, NewBook, NewBorrower};

/// Storage layer failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A versioned write or uniqueness rule lost against a concurrent writer
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db)
                if db.is_unique_violation() || db.is_check_violation() || db.is_foreign_key_violation() =>
            {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait BorrowerRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Borrower>>;
    async fn find_by_registration(&self, registration: &str) -> StoreResult<Option<Borrower>>;
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Borrower>>;
    /// Any active loan of the borrower whose due date is before `today`
    async fn find_active_overdue_loan(&self, borrower_id: i32, today: NaiveDate) -> StoreResult<Option<Loan>>;
    /// One page of matching borrowers, ordered by name, with the total match count
    async fn search(&self, query: &BorrowerQuery) -> StoreResult<(Vec<Borrower>, i64)>;
    async fn insert(&self, borrower: NewBorrower) -> StoreResult<Borrower>;
}

#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Book>>;
    async fn find_by_catalog_code(&self, code: &str) -> StoreResult<Option<Book>>;
    /// One page of matching books, ordered by title, with the total match count
    async fn search(&self, query: &BookQuery) -> StoreResult<(Vec<Book>, i64)>;
    async fn insert(&self, book: NewBook) -> StoreResult<Book>;
}

#[async_trait]
pub trait LoanRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Loan>>;
    async fn find_active_loan_of(&self, borrower_id: i32, book_id: i32) -> StoreResult<Option<Loan>>;
    async fn active_loans_of(&self, borrower_id: i32) -> StoreResult<Vec<Loan>>;
    async fn history_of_borrower(&self, borrower_id: i32) -> StoreResult<Vec<Loan>>;
    async fn history_of_book(&self, book_id: i32) -> StoreResult<Vec<Loan>>;
    /// One page of matching loans, newest first, with the total match count
    async fn search(&self, query: &LoanQuery, today: NaiveDate) -> StoreResult<(Vec<Loan>, i64)>;
    async fn count_active(&self) -> StoreResult<i64>;
    async fn count_overdue(&self, today: NaiveDate) -> StoreResult<i64>;
}

/// Writes collected by one transition. Updates carry the version they were loaded at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub borrowers: Vec<Borrower>,
    pub books: Vec<Book>,
    pub new_loans: Vec<Loan>,
    pub loans: Vec<Loan>,
    pub deleted_books: Vec<Book>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `borrower`, replacing an earlier registration of the same id
    pub fn update_borrower(&mut self, borrower: &Borrower) {
        replace_or_push(&mut self.borrowers, borrower, |b| b.id);
    }

    pub fn update_book(&mut self, book: &Book) {
        replace_or_push(&mut self.books, book, |b| b.id);
    }

    pub fn update_loan(&mut self, loan: &Loan) {
        replace_or_push(&mut self.loans, loan, |l| l.id);
    }

    /// The store assigns the id; the loan's own `id` is ignored
    pub fn insert_loan(&mut self, loan: Loan) {
        self.new_loans.push(loan);
    }

    /// Removes `book`; refused by the store if it changed since it was loaded or has loans
    pub fn delete_book(&mut self, book: &Book) {
        replace_or_push(&mut self.deleted_books, book, |b| b.id);
    }

    pub fn is_empty(&self) -> bool {
        self.borrowers.is_empty()
            && self.books.is_empty()
            && self.new_loans.is_empty()
            && self.loans.is_empty()
            && self.deleted_books.is_empty()
    }
}

fn replace_or_push<T: Clone>(entries: &mut Vec<T>, entry: &T, id: impl Fn(&T) -> i32) {
    match entries.iter_mut().find(|e| id(e) == id(entry)) {
        Some(existing) => *existing = entry.clone(),
        None => entries.push(entry.clone()),
    }
}

/// Result of a successful commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Ids assigned to `ChangeSet::new_loans`, in order
    pub inserted_loan_ids: Vec<i32>,
}

#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Applies every entry of `changes` or none of them
    async fn commit(&self, changes: ChangeSet) -> StoreResult<CommitReceipt>;
}

/// Storage collaborators, bundled
#[derive(Clone)]
pub struct Stores {
    pub borrowers: Arc<dyn BorrowerRepository>,
    pub books: Arc<dyn BookRepository>,
    pub loans: Arc<dyn LoanRepository>,
    pub unit_of_work: Arc<dyn UnitOfWork>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialCheck {
    Match,
    Mismatch,
}

pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, borrower: &Borrower, secret: &str) -> CredentialCheck;
}

/// Sink for every denial and failure reason the engine produces
pub trait Notifier: Send + Sync {
    fn report(&self, reason: &str);
}

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct FixedClock {
    today: RwLock<NaiveDate>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self { today: RwLock::new(today) }
    }

    pub fn set(&self, day: NaiveDate) {
        *self.today.write().unwrap_or_else(|e| e.into_inner()) = day;
    }

    pub fn advance(&self, days: i64) {
        let mut today = self.today.write().unwrap_or_else(|e| e.into_inner());
        *today += Duration::days(days);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.today.read().unwrap_or_else(|e| e.into_inner())
    }
}
