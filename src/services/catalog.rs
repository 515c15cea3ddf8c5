//! Catalog service: book registration and copy counts

use validator::Validate;

use crate::{
    circulation::{ChangeSet, CirculationError, Missing, StoreError, Stores},
    error::{AppError, AppResult},
    models::{
        book::{CreateBook, UpdateBook, UpdateStock},
        Book, BookDetails, BookPage, BookQuery, NewBook,
    },
};

#[derive(Clone)]
pub struct CatalogService {
    stores: Stores,
}

impl CatalogService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Register a new book with every copy available
    pub async fn create_book(&self, book: CreateBook) -> AppResult<BookDetails> {
        book.validate()?;

        if self.stores.books.find_by_catalog_code(&book.catalog_code).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Catalog code '{}' is already in use",
                book.catalog_code
            )));
        }

        let code = book.catalog_code.clone();
        let created = self.stores.books.insert(NewBook::from(book)).await.map_err(|e| match e {
            StoreError::Conflict(_) => AppError::Conflict(format!("Catalog code '{}' is already in use", code)),
            other => other.into(),
        })?;

        tracing::info!(book_id = created.id, catalog_code = %created.catalog_code, stock = created.stock, "Book registered");
        Ok(created.into())
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        Ok(self.load(id).await?.into())
    }

    /// Search the catalog with pagination
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<BookPage> {
        let (books, total) = self.stores.books.search(query).await?;
        let paging = query.paging();
        Ok(BookPage {
            items: books.into_iter().map(BookDetails::from).collect(),
            total,
            page: paging.page,
            per_page: paging.per_page,
        })
    }

    /// Change descriptive fields. Copy counts are left alone, so this is allowed
    /// while copies are out.
    pub async fn update_book(&self, id: i32, update: UpdateBook) -> AppResult<BookDetails> {
        update.validate()?;

        let mut book = self.load(id).await?;
        update.apply(&mut book);

        let mut changes = ChangeSet::new();
        changes.update_book(&book);
        self.stores.unit_of_work.commit(changes).await?;
        book.version += 1;

        tracing::info!(book_id = book.id, "Book updated");
        Ok(book.into())
    }

    /// Remove a book that was never lent. Books with loan history are kept so
    /// that the history stays whole.
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        let book = self.load(id).await?;
        if book.on_loan() > 0 {
            return Err(AppError::BusinessRule(format!(
                "{} copies of book {} are on loan",
                book.on_loan(),
                book.id
            )));
        }
        if !self.stores.loans.history_of_book(id).await?.is_empty() {
            return Err(AppError::BusinessRule(format!("book {} has loan history", book.id)));
        }

        let mut changes = ChangeSet::new();
        changes.delete_book(&book);
        self.stores.unit_of_work.commit(changes).await?;

        tracing::info!(book_id = book.id, catalog_code = %book.catalog_code, "Book deleted");
        Ok(())
    }

    /// Change how many copies the library owns. Only allowed while every copy
    /// is on the shelf.
    pub async fn update_stock(&self, id: i32, update: UpdateStock) -> AppResult<BookDetails> {
        update.validate()?;

        let mut book = self.load(id).await?;
        if book.on_loan() > 0 {
            return Err(AppError::BusinessRule(format!(
                "{} copies of book {} are on loan",
                book.on_loan(),
                book.id
            )));
        }

        book.stock = update.stock;
        book.available = update.stock;

        let mut changes = ChangeSet::new();
        changes.update_book(&book);
        self.stores.unit_of_work.commit(changes).await?;
        book.version += 1;

        tracing::info!(book_id = book.id, stock = book.stock, "Book stock updated");
        Ok(book.into())
    }

    async fn load(&self, id: i32) -> AppResult<Book> {
        self.stores
            .books
            .find_by_id(id)
            .await?
            .ok_or_else(|| CirculationError::NotFound(Missing::Book(id.to_string())).into())
    }
}
