//! Reservation queue endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::reservation::{ReservationDetails, ReservationFilter, ReservationReceipt},
};

use super::AuthenticatedUser;

/// Reservation request
#[derive(Deserialize, ToSchema)]
pub struct ReserveRequest {
    /// Book to reserve
    pub book_id: i32,
}

/// Reserve a book with no available copies. Returns the caller's
/// 1-based position in the book's FIFO queue.
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = ReserveRequest,
    responses(
        (status = 201, description = "Reservation placed", body = ReservationReceipt),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book is available or duplicate reservation"),
        (status = 503, description = "Lock wait timed out, retry")
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<ReserveRequest>,
) -> AppResult<(StatusCode, Json<ReservationReceipt>)> {
    let receipt = state
        .services
        .circulation
        .reserve(claims.sub, request.book_id)
        .await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Get the current user's reservations with queue positions
#[utoipa::path(
    get,
    path = "/reservations/my-reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user's reservations", body = Vec<ReservationDetails>)
    )
)]
pub async fn my_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ReservationDetails>>> {
    let reservations = state.services.circulation.user_reservations(claims.sub).await?;
    Ok(Json(reservations))
}

/// List all reservations (librarian/admin), in queue order per book
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(ReservationFilter),
    responses(
        (status = 200, description = "Reservations matching the filter", body = Vec<ReservationDetails>),
        (status = 403, description = "Staff role required")
    )
)]
pub async fn list_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(filter): Query<ReservationFilter>,
) -> AppResult<Json<Vec<ReservationDetails>>> {
    claims.require_staff()?;

    let reservations = state.services.circulation.reservations(&filter).await?;
    Ok(Json(reservations))
}

/// Cancel a reservation. Members may only cancel their own; staff may
/// cancel any. Later reservations move up on the next read.
#[utoipa::path(
    delete,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 204, description = "Reservation cancelled"),
        (status = 403, description = "Not your reservation"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation is not active")
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(reservation_id): Path<i32>,
) -> AppResult<StatusCode> {
    state
        .services
        .circulation
        .cancel_reservation(reservation_id, claims.sub, claims.role)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
