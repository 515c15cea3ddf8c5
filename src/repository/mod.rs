//! Repository layer: PostgreSQL and in-memory implementations of the storage contracts

pub mod books;
pub mod borrowers;
pub mod loans;
pub mod memory;
pub mod unit_of_work;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::circulation::Stores;

pub use memory::InMemoryStore;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub borrowers: borrowers::BorrowersRepository,
    pub books: books::BooksRepository,
    pub loans: loans::LoansRepository,
    pub unit_of_work: unit_of_work::PgUnitOfWork,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            borrowers: borrowers::BorrowersRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            unit_of_work: unit_of_work::PgUnitOfWork::new(pool.clone()),
            pool,
        }
    }

    pub fn stores(&self) -> Stores {
        Stores {
            borrowers: Arc::new(self.borrowers.clone()),
            books: Arc::new(self.books.clone()),
            loans: Arc::new(self.loans.clone()),
            unit_of_work: Arc::new(self.unit_of_work.clone()),
        }
    }
}
