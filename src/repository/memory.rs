//! In-process store implementing every storage contract.
//!
//! All tables sit behind one async mutex, so a commit validates the whole change
//! set and then applies it without any other reader or writer in between. The same
//! rules the PostgreSQL schema enforces (versions, counter bounds, one active loan
//! per borrower and book) are checked here before anything is written.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::{
    circulation::{
        BookRepository, BorrowerRepository, ChangeSet, CommitReceipt, LoanRepository, StoreError, StoreResult,
        Stores, UnitOfWork,
    },
    models::{Book, BookQuery, Borrower, BorrowerQuery, Loan, LoanQuery, NewBook, NewBorrower},
};

#[derive(Debug, Default)]
struct Tables {
    borrowers: BTreeMap<i32, Borrower>,
    books: BTreeMap<i32, Book>,
    loans: BTreeMap<i32, Loan>,
    last_borrower_id: i32,
    last_book_id: i32,
    last_loan_id: i32,
}

impl Tables {
    fn validate(&self, changes: &ChangeSet) -> StoreResult<()> {
        for b in &changes.borrowers {
            let stored = self
                .borrowers
                .get(&b.id)
                .ok_or_else(|| StoreError::Conflict(format!("borrower {} no longer exists", b.id)))?;
            check_version("borrower", b.id, stored.version, b.version)?;
            if b.loans_in_progress < 0 || b.loans_in_progress > b.loan_limit {
                return Err(StoreError::Conflict(format!("borrower {} loan counter out of bounds", b.id)));
            }
            if self
                .borrowers
                .values()
                .any(|other| other.id != b.id && other.email.eq_ignore_ascii_case(&b.email))
            {
                return Err(StoreError::Conflict(format!("email {} already in use", b.email)));
            }
        }

        for book in &changes.books {
            let stored = self
                .books
                .get(&book.id)
                .ok_or_else(|| StoreError::Conflict(format!("book {} no longer exists", book.id)))?;
            check_version("book", book.id, stored.version, book.version)?;
            if book.available < 0 || book.available > book.stock {
                return Err(StoreError::Conflict(format!("book {} availability out of bounds", book.id)));
            }
        }

        for book in &changes.deleted_books {
            let stored = self
                .books
                .get(&book.id)
                .ok_or_else(|| StoreError::Conflict(format!("book {} no longer exists", book.id)))?;
            check_version("book", book.id, stored.version, book.version)?;
            let referenced = self.loans.values().chain(&changes.new_loans).any(|l| l.book_id == book.id);
            if referenced {
                return Err(StoreError::Conflict(format!("book {} is referenced by loans", book.id)));
            }
        }

        for loan in &changes.loans {
            let stored = self
                .loans
                .get(&loan.id)
                .ok_or_else(|| StoreError::Conflict(format!("loan {} no longer exists", loan.id)))?;
            check_version("loan", loan.id, stored.version, loan.version)?;
        }

        // one active loan per borrower and book, looking at the state after this commit
        let mut active: Vec<(i32, i32)> = self
            .loans
            .values()
            .map(|l| changes.loans.iter().find(|c| c.id == l.id).unwrap_or(l))
            .filter(|l| l.is_active())
            .map(|l| (l.borrower_id, l.book_id))
            .collect();
        for loan in changes.new_loans.iter().filter(|l| l.is_active()) {
            let pair = (loan.borrower_id, loan.book_id);
            if active.contains(&pair) {
                return Err(StoreError::Conflict(format!(
                    "borrower {} already holds book {}",
                    pair.0, pair.1
                )));
            }
            active.push(pair);
        }

        Ok(())
    }

    fn apply(&mut self, changes: ChangeSet) -> CommitReceipt {
        for mut b in changes.borrowers {
            b.version += 1;
            self.borrowers.insert(b.id, b);
        }
        for mut book in changes.books {
            book.version += 1;
            self.books.insert(book.id, book);
        }
        for mut loan in changes.loans {
            loan.version += 1;
            self.loans.insert(loan.id, loan);
        }

        for book in changes.deleted_books {
            self.books.remove(&book.id);
        }

        let mut receipt = CommitReceipt::default();
        for mut loan in changes.new_loans {
            self.last_loan_id += 1;
            loan.id = self.last_loan_id;
            loan.version = 0;
            receipt.inserted_loan_ids.push(loan.id);
            self.loans.insert(loan.id, loan);
        }
        receipt
    }
}

fn check_version(entity: &str, id: i32, stored: i32, loaded: i32) -> StoreResult<()> {
    if stored != loaded {
        return Err(StoreError::Conflict(format!(
            "{} {} changed since it was loaded (version {} != {})",
            entity, id, stored, loaded
        )));
    }
    Ok(())
}

/// Storage kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage collaborators all backed by this store
    pub fn stores(self: &Arc<Self>) -> Stores {
        Stores {
            borrowers: self.clone(),
            books: self.clone(),
            loans: self.clone(),
            unit_of_work: self.clone(),
        }
    }
}

#[async_trait]
impl BorrowerRepository for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Borrower>> {
        Ok(self.tables.lock().await.borrowers.get(&id).cloned())
    }

    async fn find_by_registration(&self, registration: &str) -> StoreResult<Option<Borrower>> {
        let tables = self.tables.lock().await;
        Ok(tables.borrowers.values().find(|b| b.registration == registration).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Borrower>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .borrowers
            .values()
            .find(|b| b.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_active_overdue_loan(&self, borrower_id: i32, today: NaiveDate) -> StoreResult<Option<Loan>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .loans
            .values()
            .find(|l| l.borrower_id == borrower_id && l.is_overdue(today))
            .cloned())
    }

    async fn search(&self, query: &BorrowerQuery) -> StoreResult<(Vec<Borrower>, i64)> {
        let tables = self.tables.lock().await;
        let mut matching: Vec<&Borrower> = tables.borrowers.values().filter(|b| query.matches(b)).collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        let total = matching.len() as i64;
        Ok((query.paging().slice(matching.into_iter().cloned()), total))
    }

    async fn insert(&self, borrower: NewBorrower) -> StoreResult<Borrower> {
        let mut tables = self.tables.lock().await;
        if tables.borrowers.values().any(|b| b.registration == borrower.registration) {
            return Err(StoreError::Conflict(format!(
                "registration {} already in use",
                borrower.registration
            )));
        }
        if tables.borrowers.values().any(|b| b.email.eq_ignore_ascii_case(&borrower.email)) {
            return Err(StoreError::Conflict(format!("email {} already in use", borrower.email)));
        }

        tables.last_borrower_id += 1;
        let created = Borrower {
            id: tables.last_borrower_id,
            registration: borrower.registration,
            name: borrower.name,
            email: borrower.email,
            credential_hash: borrower.credential_hash,
            loan_limit: borrower.loan_limit,
            loans_in_progress: 0,
            blocked: false,
            block_started_on: None,
            block_ends_on: None,
            blocked_days_total: 0,
            active: true,
            version: 0,
        };
        tables.borrowers.insert(created.id, created.clone());
        Ok(created)
    }
}

#[async_trait]
impl BookRepository for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Book>> {
        Ok(self.tables.lock().await.books.get(&id).cloned())
    }

    async fn find_by_catalog_code(&self, code: &str) -> StoreResult<Option<Book>> {
        let tables = self.tables.lock().await;
        Ok(tables.books.values().find(|b| b.catalog_code == code).cloned())
    }

    async fn search(&self, query: &BookQuery) -> StoreResult<(Vec<Book>, i64)> {
        let tables = self.tables.lock().await;
        let mut matching: Vec<&Book> = tables.books.values().filter(|b| query.matches(b)).collect();
        matching.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        let total = matching.len() as i64;
        Ok((query.paging().slice(matching.into_iter().cloned()), total))
    }

    async fn insert(&self, book: NewBook) -> StoreResult<Book> {
        let mut tables = self.tables.lock().await;
        if tables.books.values().any(|b| b.catalog_code == book.catalog_code) {
            return Err(StoreError::Conflict(format!(
                "catalog code {} already in use",
                book.catalog_code
            )));
        }

        tables.last_book_id += 1;
        let created = Book {
            id: tables.last_book_id,
            catalog_code: book.catalog_code,
            title: book.title,
            author: book.author,
            edition: book.edition,
            publisher: book.publisher,
            category: book.category,
            publication_year: book.publication_year,
            cover_path: None,
            stock: book.stock,
            available: book.stock,
            version: 0,
        };
        tables.books.insert(created.id, created.clone());
        Ok(created)
    }
}

#[async_trait]
impl LoanRepository for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Loan>> {
        Ok(self.tables.lock().await.loans.get(&id).cloned())
    }

    async fn find_active_loan_of(&self, borrower_id: i32, book_id: i32) -> StoreResult<Option<Loan>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .loans
            .values()
            .find(|l| l.borrower_id == borrower_id && l.book_id == book_id && l.is_active())
            .cloned())
    }

    async fn active_loans_of(&self, borrower_id: i32) -> StoreResult<Vec<Loan>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .loans
            .values()
            .filter(|l| l.borrower_id == borrower_id && l.is_active())
            .cloned()
            .collect())
    }

    async fn history_of_borrower(&self, borrower_id: i32) -> StoreResult<Vec<Loan>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .loans
            .values()
            .rev()
            .filter(|l| l.borrower_id == borrower_id)
            .cloned()
            .collect())
    }

    async fn history_of_book(&self, book_id: i32) -> StoreResult<Vec<Loan>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .loans
            .values()
            .rev()
            .filter(|l| l.book_id == book_id)
            .cloned()
            .collect())
    }

    async fn search(&self, query: &LoanQuery, today: NaiveDate) -> StoreResult<(Vec<Loan>, i64)> {
        let tables = self.tables.lock().await;
        let matching: Vec<&Loan> = tables.loans.values().rev().filter(|l| query.matches(l, today)).collect();
        let total = matching.len() as i64;
        let items = query.paging().slice(matching.into_iter().cloned());
        Ok((items, total))
    }

    async fn count_active(&self) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        Ok(tables.loans.values().filter(|l| l.is_active()).count() as i64)
    }

    async fn count_overdue(&self, today: NaiveDate) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        Ok(tables.loans.values().filter(|l| l.is_overdue(today)).count() as i64)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    async fn commit(&self, changes: ChangeSet) -> StoreResult<CommitReceipt> {
        let mut tables = self.tables.lock().await;
        tables.validate(&changes)?;
        Ok(tables.apply(changes))
    }
}
