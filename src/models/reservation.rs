//! Reservation model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::enums::ReservationStatus;

/// Reservation model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    /// Defines FIFO order within a book's queue
    pub reserved_at: DateTime<Utc>,
    pub status: ReservationStatus,
}

/// Result of placing a reservation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationReceipt {
    pub reservation_id: i32,
    pub queue_position: i64,
}

/// Reservation with book (and optionally holder) context for display.
/// queue_position is computed per read; cancelled rows are skipped, so
/// positions compact on their own without ever rewriting rows.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationDetails {
    pub id: i32,
    pub user_id: i32,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub book_id: i32,
    pub book_title: String,
    pub isbn: String,
    pub reserved_at: DateTime<Utc>,
    pub status: ReservationStatus,
    /// 1-based rank among active reservations for the same book; null
    /// for cancelled/fulfilled rows
    pub queue_position: Option<i64>,
}

/// Typed filter for reservation listings
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ReservationFilter {
    pub book_id: Option<i32>,
    pub status: Option<ReservationStatus>,
}
