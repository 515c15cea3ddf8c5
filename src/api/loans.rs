//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    circulation::{BookKey, BorrowRequest, BorrowerKey},
    error::{AppError, AppResult},
    models::{
        loan::{LoanCounts, LoanPage},
        Loan, LoanQuery,
    },
};

/// Borrow request. The borrower is named by `borrower_id` or `registration`,
/// the book by `book_id` or `catalog_code`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoanRequest {
    pub borrower_id: Option<i32>,
    pub registration: Option<String>,
    pub book_id: Option<i32>,
    pub catalog_code: Option<String>,
    /// Borrower secret
    pub secret: String,
}

impl TryFrom<CreateLoanRequest> for BorrowRequest {
    type Error = AppError;

    fn try_from(request: CreateLoanRequest) -> Result<Self, Self::Error> {
        let borrower = match (request.borrower_id, request.registration) {
            (Some(id), None) => BorrowerKey::Id(id),
            (None, Some(registration)) => BorrowerKey::Registration(registration),
            _ => {
                return Err(AppError::BadRequest(
                    "Exactly one of borrower_id or registration is required".to_string(),
                ))
            }
        };
        let book = match (request.book_id, request.catalog_code) {
            (Some(id), None) => BookKey::Id(id),
            (None, Some(code)) => BookKey::CatalogCode(code),
            _ => {
                return Err(AppError::BadRequest(
                    "Exactly one of book_id or catalog_code is required".to_string(),
                ))
            }
        };
        Ok(BorrowRequest {
            borrower,
            book,
            secret: request.secret,
        })
    }
}

/// Renew or return request
#[derive(Debug, Deserialize, ToSchema)]
pub struct SecretRequest {
    /// Borrower secret
    pub secret: String,
}

/// Loan with a status message
#[derive(Serialize, ToSchema)]
pub struct LoanResponse {
    pub message: String,
    pub loan: Loan,
}

/// Search loans
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(LoanQuery),
    responses(
        (status = 200, description = "Matching loans, newest first", body = LoanPage)
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<LoanPage>> {
    let page = state.services.loans.search(&query).await?;
    Ok(Json(page))
}

/// Active and overdue loan counts
#[utoipa::path(
    get,
    path = "/loans/stats",
    tag = "loans",
    responses(
        (status = 200, description = "Loan counters", body = LoanCounts)
    )
)]
pub async fn get_loan_stats(State(state): State<crate::AppState>) -> AppResult<Json<LoanCounts>> {
    let counts = state.services.loans.counts().await?;
    Ok(Json(counts))
}

/// Get loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = Loan),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_loan(State(state): State<crate::AppState>, Path(id): Path<i32>) -> AppResult<Json<Loan>> {
    let loan = state.services.loans.get_loan(id).await?;
    Ok(Json(loan))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanResponse),
        (status = 400, description = "Loan denied or incorrect credential", body = crate::error::ErrorResponse),
        (status = 404, description = "Borrower or book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Lost a concurrent update", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    let request = BorrowRequest::try_from(request)?;
    let loan = state.services.loans.borrow(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse {
            message: format!("Book borrowed, due on {}", loan.due_on),
            loan,
        }),
    ))
}

/// Renew a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/renew",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = SecretRequest,
    responses(
        (status = 200, description = "Loan renewed", body = LoanResponse),
        (status = 400, description = "Renewal denied or incorrect credential", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Lost a concurrent update", body = crate::error::ErrorResponse)
    )
)]
pub async fn renew_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
    Json(request): Json<SecretRequest>,
) -> AppResult<Json<LoanResponse>> {
    let loan = state.services.loans.renew(loan_id, &request.secret).await?;

    Ok(Json(LoanResponse {
        message: format!("Loan renewed ({} renewals)", loan.renewal_count),
        loan,
    }))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = SecretRequest,
    responses(
        (status = 200, description = "Book returned", body = LoanResponse),
        (status = 400, description = "Already returned or incorrect credential", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Lost a concurrent update", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
    Json(request): Json<SecretRequest>,
) -> AppResult<Json<LoanResponse>> {
    let loan = state.services.loans.return_loan(loan_id, &request.secret).await?;

    let message = match loan.returned_on {
        Some(day) if day > loan.due_on => format!("Book returned {} days late", loan.days_late(day)),
        _ => "Book returned".to_string(),
    };

    Ok(Json(LoanResponse { message, loan }))
}
