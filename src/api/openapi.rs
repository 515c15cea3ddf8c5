//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, borrowers, health, loans};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library Circulation API",
        version = "1.0.0",
        description = "Borrowing, renewing and returning library books",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        // Borrowers
        borrowers::list_borrowers,
        borrowers::create_borrower,
        borrowers::get_borrower,
        borrowers::update_borrower,
        borrowers::deactivate_borrower,
        borrowers::reactivate_borrower,
        borrowers::get_borrower_loans,
        // Books
        books::list_books,
        books::create_book,
        books::get_book,
        books::update_book,
        books::delete_book,
        books::update_stock,
        books::get_book_loans,
        // Loans
        loans::list_loans,
        loans::get_loan_stats,
        loans::get_loan,
        loans::create_loan,
        loans::renew_loan,
        loans::return_loan,
    ),
    components(
        schemas(
            health::HealthResponse,
            crate::error::ErrorResponse,
            // Borrowers
            crate::models::Borrower,
            crate::models::BlockKind,
            crate::models::borrower::CreateBorrower,
            crate::models::borrower::UpdateBorrower,
            crate::models::BorrowerPage,
            // Books
            crate::models::Book,
            crate::models::BookDetails,
            crate::models::BookStatus,
            crate::models::book::CreateBook,
            crate::models::book::UpdateStock,
            crate::models::book::UpdateBook,
            crate::models::BookPage,
            // Loans
            crate::models::Loan,
            crate::models::LoanStatus,
            crate::models::loan::LoanPage,
            crate::models::loan::LoanCounts,
            loans::CreateLoanRequest,
            loans::SecretRequest,
            loans::LoanResponse,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "borrowers", description = "Borrower registration, accounts and history"),
        (name = "books", description = "Catalog and copy counts"),
        (name = "loans", description = "Borrow, renew and return")
    )
)]
pub struct ApiDoc;

/// Create OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
