//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{
        enums::LoanStatus,
        loan::{Loan, LoanDetails, LoanFilter, ReturnOutcome},
    },
};

use super::AuthenticatedUser;

/// Borrow request
#[derive(Deserialize, ToSchema)]
pub struct BorrowRequest {
    /// Book to borrow
    pub book_id: i32,
}

/// Status filter for my-loans
#[derive(Deserialize, IntoParams)]
pub struct MyLoansQuery {
    pub status: Option<LoanStatus>,
}

/// Borrow a book. The caller becomes the borrower; availability, the
/// per-user loan cap, and the no-duplicate-loan rule are checked
/// atomically against the book row.
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 404, description = "Book not found"),
        (status = 409, description = "No copies available, loan limit reached, or already borrowed"),
        (status = 503, description = "Lock wait timed out, retry")
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BorrowRequest>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let loan = state
        .services
        .circulation
        .borrow(claims.sub, request.book_id)
        .await?;

    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a borrowed book. Computes the fine for late returns and
/// releases the copy. Idempotence: a second return of the same loan
/// fails with 409 and leaves the fine unchanged.
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = ReturnOutcome),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Already returned"),
        (status = 503, description = "Lock wait timed out, retry")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<ReturnOutcome>> {
    let outcome = state.services.circulation.return_loan(loan_id).await?;
    Ok(Json(outcome))
}

/// Get the current user's loans
#[utoipa::path(
    get,
    path = "/loans/my-loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(MyLoansQuery),
    responses(
        (status = 200, description = "Current user's loans", body = Vec<LoanDetails>)
    )
)]
pub async fn my_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<MyLoansQuery>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state
        .services
        .circulation
        .user_loans(claims.sub, query.status)
        .await?;
    Ok(Json(loans))
}

/// List all loans (librarian/admin)
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanFilter),
    responses(
        (status = 200, description = "Loans matching the filter", body = Vec<LoanDetails>),
        (status = 403, description = "Staff role required")
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(filter): Query<LoanFilter>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    claims.require_staff()?;

    let loans = state.services.circulation.loans(&filter).await?;
    Ok(Json(loans))
}

/// Get a loan by ID. Members only see their own loans.
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let owner_id = if claims.role.is_staff() {
        None
    } else {
        Some(claims.sub)
    };

    let loan = state.services.circulation.loan(loan_id, owner_id).await?;
    Ok(Json(loan))
}
