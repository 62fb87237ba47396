//! Reporting endpoints (librarian/admin)

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

use super::AuthenticatedUser;

/// Window/limit parameters for most-borrowed
#[derive(Deserialize, IntoParams)]
pub struct MostBorrowedQuery {
    /// Look-back window in days (default 30)
    pub days: Option<i32>,
    /// Maximum number of books (default 10)
    pub limit: Option<i64>,
}

/// Window parameter for member-activity
#[derive(Deserialize, IntoParams)]
pub struct MemberActivityQuery {
    /// Look-back window in days (default 30)
    pub days: Option<i32>,
}

/// Date range for loans-by-date
#[derive(Deserialize, IntoParams)]
pub struct LoansByDateQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Row of the most-borrowed report
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MostBorrowedEntry {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub total_copies: i32,
    pub available_copies: i32,
    pub borrow_count: i64,
}

/// Row of the overdue report
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OverdueEntry {
    pub loan_id: i32,
    pub user_id: i32,
    pub user_name: String,
    pub user_email: String,
    pub book_id: i32,
    pub book_title: String,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub days_overdue: i64,
    /// Fine the loan would incur if returned today
    pub projected_fine: Decimal,
}

/// Row of the member-activity report
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MemberActivityEntry {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub total_loans: i64,
    pub active_loans: i64,
    pub overdue_loans: i64,
    pub total_fines: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookStatistics {
    pub unique_titles: i64,
    pub total_copies: i64,
    pub available_copies: i64,
    pub borrowed_copies: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoanStatistics {
    pub active: i64,
    pub overdue: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReservationStatistics {
    pub active: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MemberStatistics {
    pub total: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FineStatistics {
    /// Fines recorded on returned loans
    pub collected: Decimal,
    /// Projected fines on currently-overdue loans
    pub outstanding: Decimal,
}

/// Whole-library statistics rollup
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LibraryStatistics {
    pub books: BookStatistics,
    pub loans: LoanStatistics,
    pub reservations: ReservationStatistics,
    pub members: MemberStatistics,
    pub fines: FineStatistics,
}

/// Row of the loans-by-date series
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoansByDateEntry {
    pub date: NaiveDate,
    pub loans_count: i64,
    pub unique_users: i64,
    pub unique_books: i64,
}

/// Most borrowed books within a window
#[utoipa::path(
    get,
    path = "/reports/most-borrowed",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(MostBorrowedQuery),
    responses(
        (status = 200, description = "Most borrowed books", body = Vec<MostBorrowedEntry>),
        (status = 403, description = "Staff role required")
    )
)]
pub async fn most_borrowed(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<MostBorrowedQuery>,
) -> AppResult<Json<Vec<MostBorrowedEntry>>> {
    claims.require_staff()?;

    let entries = state
        .services
        .reports
        .most_borrowed(query.days.unwrap_or(30), query.limit.unwrap_or(10))
        .await?;
    Ok(Json(entries))
}

/// Overdue loans with projected fines
#[utoipa::path(
    get,
    path = "/reports/overdue",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue loans", body = Vec<OverdueEntry>),
        (status = 403, description = "Staff role required")
    )
)]
pub async fn overdue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<OverdueEntry>>> {
    claims.require_staff()?;

    let entries = state.services.reports.overdue_loans().await?;
    Ok(Json(entries))
}

/// Per-member activity within a window
#[utoipa::path(
    get,
    path = "/reports/member-activity",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(MemberActivityQuery),
    responses(
        (status = 200, description = "Member activity", body = Vec<MemberActivityEntry>),
        (status = 403, description = "Staff role required")
    )
)]
pub async fn member_activity(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<MemberActivityQuery>,
) -> AppResult<Json<Vec<MemberActivityEntry>>> {
    claims.require_staff()?;

    let entries = state
        .services
        .reports
        .member_activity(query.days.unwrap_or(30))
        .await?;
    Ok(Json(entries))
}

/// Library-wide statistics
#[utoipa::path(
    get,
    path = "/reports/statistics",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Library statistics", body = LibraryStatistics),
        (status = 403, description = "Staff role required")
    )
)]
pub async fn statistics(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<LibraryStatistics>> {
    claims.require_staff()?;

    let stats = state.services.reports.statistics().await?;
    Ok(Json(stats))
}

/// Daily loan counts over a date range
#[utoipa::path(
    get,
    path = "/reports/loans-by-date",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(LoansByDateQuery),
    responses(
        (status = 200, description = "Daily loan counts", body = Vec<LoansByDateEntry>),
        (status = 400, description = "Invalid date range"),
        (status = 403, description = "Staff role required")
    )
)]
pub async fn loans_by_date(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoansByDateQuery>,
) -> AppResult<Json<Vec<LoansByDateEntry>>> {
    claims.require_staff()?;

    if query.end_date < query.start_date {
        return Err(AppError::Validation(
            "end_date must not be before start_date".to_string(),
        ));
    }

    let entries = state
        .services
        .reports
        .loans_by_date(query.start_date, query.end_date)
        .await?;
    Ok(Json(entries))
}
