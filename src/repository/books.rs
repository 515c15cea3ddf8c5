//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    circulation::{BookRepository, StoreResult},
    models::{Book, BookQuery, NewBook},
};

pub(crate) const BOOK_COLUMNS: &str = "id, catalog_code, title, author, edition, publisher, category, \
     publication_year, cover_path, stock, available, version";

const SEARCH_FILTER: &str = r#"
    ($1::TEXT IS NULL OR LOWER(title) LIKE '%' || LOWER($1) || '%')
    AND ($2::TEXT IS NULL OR LOWER(author) LIKE '%' || LOWER($2) || '%')
    AND ($3::TEXT IS NULL OR LOWER(publisher) LIKE '%' || LOWER($3) || '%')
    AND ($4::TEXT IS NULL OR LOWER(category) LIKE '%' || LOWER($4) || '%')
    AND ($5::TEXT IS NULL OR catalog_code = $5)
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for BooksRepository {
    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn find_by_catalog_code(&self, code: &str) -> StoreResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE catalog_code = $1", BOOK_COLUMNS))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    /// Search books with pagination
    async fn search(&self, query: &BookQuery) -> StoreResult<(Vec<Book>, i64)> {
        let paging = query.paging();

        let count_query = format!("SELECT COUNT(*) FROM books WHERE {}", SEARCH_FILTER);
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(&query.title)
            .bind(&query.author)
            .bind(&query.publisher)
            .bind(&query.category)
            .bind(&query.catalog_code)
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            "SELECT {} FROM books WHERE {} ORDER BY title, id LIMIT $6 OFFSET $7",
            BOOK_COLUMNS, SEARCH_FILTER
        );
        let books = sqlx::query_as::<_, Book>(&select_query)
            .bind(&query.title)
            .bind(&query.author)
            .bind(&query.publisher)
            .bind(&query.category)
            .bind(&query.catalog_code)
            .bind(paging.per_page)
            .bind(paging.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((books, total))
    }

    /// Create a new book with every copy on the shelf
    async fn insert(&self, book: NewBook) -> StoreResult<Book> {
        let created = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (catalog_code, title, author, edition, publisher, category,
                               publication_year, stock, available)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&book.catalog_code)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.edition)
        .bind(&book.publisher)
        .bind(&book.category)
        .bind(book.publication_year)
        .bind(book.stock)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }
}
