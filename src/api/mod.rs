//! API handlers for the circulation REST endpoints

pub mod books;
pub mod borrowers;
pub mod health;
pub mod loans;
pub mod openapi;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Borrowers
        .route("/borrowers", get(borrowers::list_borrowers).post(borrowers::create_borrower))
        .route("/borrowers/:id", get(borrowers::get_borrower).put(borrowers::update_borrower))
        .route("/borrowers/:id/deactivate", post(borrowers::deactivate_borrower))
        .route("/borrowers/:id/reactivate", post(borrowers::reactivate_borrower))
        .route("/borrowers/:id/loans", get(borrowers::get_borrower_loans))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book).put(books::update_book).delete(books::delete_book),
        )
        .route("/books/:id/stock", put(books::update_stock))
        .route("/books/:id/loans", get(books::get_book_loans))
        // Loans
        .route("/loans", get(loans::list_loans).post(loans::create_loan))
        .route("/loans/stats", get(loans::get_loan_stats))
        .route("/loans/:id", get(loans::get_loan))
        .route("/loans/:id/renew", post(loans::renew_loan))
        .route("/loans/:id/return", post(loans::return_loan))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
