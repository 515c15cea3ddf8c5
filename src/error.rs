//! Error types for the circulation server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::circulation::{CirculationError, Denial, Missing, StoreError};

/// Numeric error codes carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 3,
    NoSuchBorrower = 4,
    NoSuchBook = 5,
    NoSuchLoan = 6,
    BookNotAvailable = 7,
    Duplicate = 8,
    MaxLoansReached = 11,
    AlreadyBorrowed = 13,
    BadValue = 18,
    NoSuchData = 20,
    BorrowerInactive = 22,
    BorrowerBlocked = 23,
    OverdueLoans = 24,
    AlreadyReturned = 25,
    MaxRenewalsReached = 26,
    RenewalOverdue = 27,
    IncorrectCredential = 28,
    ConcurrentUpdate = 29,
    LoansOutstanding = 30,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Circulation(#[from] CirculationError),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

fn circulation_status(e: &CirculationError) -> (StatusCode, ErrorCode) {
    match e {
        CirculationError::NotFound(missing) => {
            let code = match missing {
                Missing::Borrower(_) => ErrorCode::NoSuchBorrower,
                Missing::Book(_) => ErrorCode::NoSuchBook,
                Missing::Loan(_) => ErrorCode::NoSuchLoan,
            };
            (StatusCode::NOT_FOUND, code)
        }
        CirculationError::Denied(denial) => {
            let code = match denial {
                Denial::BorrowerInactive => ErrorCode::BorrowerInactive,
                Denial::TemporarilyBlocked { .. } => ErrorCode::BorrowerBlocked,
                Denial::OverdueLoansOutstanding => ErrorCode::OverdueLoans,
                Denial::AlreadyBorrowed => ErrorCode::AlreadyBorrowed,
                Denial::LoanLimitReached { .. } => ErrorCode::MaxLoansReached,
                Denial::BookUnavailable => ErrorCode::BookNotAvailable,
                Denial::AlreadyReturned => ErrorCode::AlreadyReturned,
                Denial::RenewalLimitReached { .. } => ErrorCode::MaxRenewalsReached,
                Denial::RenewalAfterDueDate => ErrorCode::RenewalOverdue,
            };
            (StatusCode::BAD_REQUEST, code)
        }
        CirculationError::IncorrectCredential => (StatusCode::BAD_REQUEST, ErrorCode::IncorrectCredential),
        CirculationError::Conflict(_) => (StatusCode::CONFLICT, ErrorCode::ConcurrentUpdate),
        CirculationError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::BusinessRule(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::LoansOutstanding, msg.clone())
            }
            AppError::Store(StoreError::Conflict(msg)) => {
                (StatusCode::CONFLICT, ErrorCode::ConcurrentUpdate, msg.clone())
            }
            AppError::Store(StoreError::Backend(detail)) => {
                tracing::error!("Storage error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Circulation(e) => {
                let (status, code) = circulation_status(e);
                (status, code, e.to_string())
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
