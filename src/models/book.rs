//! Book (catalog title with counted copies) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{contains_ignore_case, Paging};

/// Book availability, derived from the available copy count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    Available,
    Unavailable,
}

/// Book model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub catalog_code: String,
    pub title: String,
    pub author: String,
    pub edition: Option<String>,
    pub publisher: String,
    pub category: Option<String>,
    pub publication_year: Option<i32>,
    pub cover_path: Option<String>,
    /// Copies owned by the library
    pub stock: i32,
    /// Copies on the shelf, ready to be lent
    pub available: i32,
    #[serde(skip)]
    pub version: i32,
}

impl Book {
    pub fn status(&self) -> BookStatus {
        if self.available > 0 {
            BookStatus::Available
        } else {
            BookStatus::Unavailable
        }
    }

    pub fn is_available(&self) -> bool {
        self.status() == BookStatus::Available
    }

    /// Copies currently lent out
    pub fn on_loan(&self) -> i32 {
        self.stock - self.available
    }
}

/// Book insertion payload
#[derive(Debug, Clone)]
pub struct NewBook {
    pub catalog_code: String,
    pub title: String,
    pub author: String,
    pub edition: Option<String>,
    pub publisher: String,
    pub category: Option<String>,
    pub publication_year: Option<i32>,
    pub stock: i32,
}

/// Register book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 20, message = "Catalog code must be 1 to 20 characters"))]
    pub catalog_code: String,
    #[validate(length(min = 1, max = 100, message = "Title must be 1 to 100 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 50, message = "Author must be 1 to 50 characters"))]
    pub author: String,
    pub edition: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Publisher must be 1 to 50 characters"))]
    pub publisher: String,
    pub category: Option<String>,
    pub publication_year: Option<i32>,
    #[validate(range(min = 1, message = "A book needs at least one copy"))]
    pub stock: i32,
}

impl From<CreateBook> for NewBook {
    fn from(b: CreateBook) -> Self {
        Self {
            catalog_code: b.catalog_code,
            title: b.title,
            author: b.author,
            edition: b.edition,
            publisher: b.publisher,
            category: b.category,
            publication_year: b.publication_year,
            stock: b.stock,
        }
    }
}

/// Stock update request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStock {
    #[validate(range(min = 1, message = "A book needs at least one copy"))]
    pub stock: i32,
}

/// Update book request. Only descriptive fields; copies change through the stock update.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 100, message = "Title must be 1 to 100 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Author must be 1 to 50 characters"))]
    pub author: Option<String>,
    #[validate(length(max = 20))]
    pub edition: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Publisher must be 1 to 50 characters"))]
    pub publisher: Option<String>,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    pub publication_year: Option<i32>,
}

impl UpdateBook {
    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(edition) = self.edition {
            book.edition = Some(edition);
        }
        if let Some(publisher) = self.publisher {
            book.publisher = publisher;
        }
        if let Some(category) = self.category {
            book.category = Some(category);
        }
        if let Some(year) = self.publication_year {
            book.publication_year = Some(year);
        }
    }
}

/// Book query parameters. Text filters match any part, any case.
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub category: Option<String>,
    /// Exact catalog code
    pub catalog_code: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl BookQuery {
    pub fn paging(&self) -> Paging {
        Paging::new(self.page, self.per_page)
    }

    pub fn matches(&self, book: &Book) -> bool {
        self.title.as_deref().map_or(true, |t| contains_ignore_case(&book.title, t))
            && self.author.as_deref().map_or(true, |a| contains_ignore_case(&book.author, a))
            && self.publisher.as_deref().map_or(true, |p| contains_ignore_case(&book.publisher, p))
            && self
                .category
                .as_deref()
                .map_or(true, |c| book.category.as_deref().map_or(false, |own| contains_ignore_case(own, c)))
            && self.catalog_code.as_deref().map_or(true, |c| book.catalog_code == c)
    }
}

/// One page of books
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookPage {
    pub items: Vec<BookDetails>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Book with its derived status, for display
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub status: BookStatus,
    pub on_loan: i32,
}

impl From<Book> for BookDetails {
    fn from(book: Book) -> Self {
        Self {
            status: book.status(),
            on_loan: book.on_loan(),
            book,
        }
    }
}
