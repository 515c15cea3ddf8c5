//! Borrower management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        borrower::{CreateBorrower, UpdateBorrower},
        Borrower, BorrowerPage, BorrowerQuery, Loan,
    },
};

/// Search borrowers
#[utoipa::path(
    get,
    path = "/borrowers",
    tag = "borrowers",
    params(BorrowerQuery),
    responses(
        (status = 200, description = "Matching borrowers, by name", body = BorrowerPage)
    )
)]
pub async fn list_borrowers(
    State(state): State<crate::AppState>,
    Query(query): Query<BorrowerQuery>,
) -> AppResult<Json<BorrowerPage>> {
    let page = state.services.borrowers.search_borrowers(&query).await?;
    Ok(Json(page))
}

/// Get borrower by ID
#[utoipa::path(
    get,
    path = "/borrowers/{id}",
    tag = "borrowers",
    params(
        ("id" = i32, Path, description = "Borrower ID")
    ),
    responses(
        (status = 200, description = "Borrower details", body = Borrower),
        (status = 404, description = "Borrower not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_borrower(State(state): State<crate::AppState>, Path(id): Path<i32>) -> AppResult<Json<Borrower>> {
    let borrower = state.services.borrowers.get_borrower(id).await?;
    Ok(Json(borrower))
}

/// Register a new borrower
#[utoipa::path(
    post,
    path = "/borrowers",
    tag = "borrowers",
    request_body = CreateBorrower,
    responses(
        (status = 201, description = "Borrower registered", body = Borrower),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Registration number or email already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_borrower(
    State(state): State<crate::AppState>,
    Json(borrower): Json<CreateBorrower>,
) -> AppResult<(StatusCode, Json<Borrower>)> {
    let created = state.services.borrowers.create_borrower(borrower).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a borrower
#[utoipa::path(
    put,
    path = "/borrowers/{id}",
    tag = "borrowers",
    params(
        ("id" = i32, Path, description = "Borrower ID")
    ),
    request_body = UpdateBorrower,
    responses(
        (status = 200, description = "Borrower updated", body = Borrower),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Borrower not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already exists", body = crate::error::ErrorResponse),
        (status = 422, description = "Loan limit below the loans held", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_borrower(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(update): Json<UpdateBorrower>,
) -> AppResult<Json<Borrower>> {
    let borrower = state.services.borrowers.update_borrower(id, update).await?;
    Ok(Json(borrower))
}

/// Deactivate a borrower
#[utoipa::path(
    post,
    path = "/borrowers/{id}/deactivate",
    tag = "borrowers",
    params(
        ("id" = i32, Path, description = "Borrower ID")
    ),
    responses(
        (status = 200, description = "Borrower deactivated", body = Borrower),
        (status = 404, description = "Borrower not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Borrower changed concurrently", body = crate::error::ErrorResponse)
    )
)]
pub async fn deactivate_borrower(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Borrower>> {
    let borrower = state.services.borrowers.deactivate_borrower(id).await?;
    Ok(Json(borrower))
}

/// Reactivate a borrower
#[utoipa::path(
    post,
    path = "/borrowers/{id}/reactivate",
    tag = "borrowers",
    params(
        ("id" = i32, Path, description = "Borrower ID")
    ),
    responses(
        (status = 200, description = "Borrower reactivated", body = Borrower),
        (status = 404, description = "Borrower not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Borrower changed concurrently", body = crate::error::ErrorResponse)
    )
)]
pub async fn reactivate_borrower(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Borrower>> {
    let borrower = state.services.borrowers.reactivate_borrower(id).await?;
    Ok(Json(borrower))
}

/// Get the loan history of a borrower
#[utoipa::path(
    get,
    path = "/borrowers/{id}/loans",
    tag = "borrowers",
    params(
        ("id" = i32, Path, description = "Borrower ID")
    ),
    responses(
        (status = 200, description = "Loans of the borrower, newest first", body = Vec<Loan>),
        (status = 404, description = "Borrower not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_borrower_loans(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<Loan>>> {
    let loans = state.services.loans.get_borrower_loans(id).await?;
    Ok(Json(loans))
}
