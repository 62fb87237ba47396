//! Error types for Bibliotheca server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error codes returned in JSON error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchUser = 4,
    NoSuchBook = 5,
    NoSuchLoan = 6,
    NoSuchReservation = 7,
    NoCopiesAvailable = 8,
    LoanLimitReached = 9,
    AlreadyBorrowed = 10,
    AlreadyReturned = 11,
    DuplicateReservation = 12,
    ReservationNotActive = 13,
    BookStillAvailable = 14,
    Duplicate = 15,
    BadValue = 16,
    TryAgain = 17,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Postgres SQLSTATE codes that mean "the row lock could not be taken
/// in time" rather than "the statement is broken". These must surface
/// as retryable errors, not 500s.
const PG_LOCK_NOT_AVAILABLE: &str = "55P03";
const PG_SERIALIZATION_FAILURE: &str = "40001";
const PG_DEADLOCK_DETECTED: &str = "40P01";

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) => {
                if let Some(code) = db.code() {
                    if code == PG_LOCK_NOT_AVAILABLE
                        || code == PG_SERIALIZATION_FAILURE
                        || code == PG_DEADLOCK_DETECTED
                    {
                        return AppError::Transient(
                            "Operation timed out waiting for a lock, try again".to_string(),
                        );
                    }
                }
                AppError::Database(e)
            }
            sqlx::Error::PoolTimedOut => {
                AppError::Transient("Database connection pool exhausted, try again".to_string())
            }
            _ => AppError::Database(e),
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => {
                let code = if msg.starts_with("User") {
                    ErrorCode::NoSuchUser
                } else if msg.starts_with("Loan") {
                    ErrorCode::NoSuchLoan
                } else if msg.starts_with("Reservation") {
                    ErrorCode::NoSuchReservation
                } else {
                    ErrorCode::NoSuchBook
                };
                (StatusCode::NOT_FOUND, code, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => {
                let code = conflict_code(msg);
                (StatusCode::CONFLICT, code, msg.clone())
            }
            AppError::Transient(msg) => {
                tracing::warn!("Transient failure: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::TryAgain, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
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

/// Pick the circulation-specific error code for a Conflict message.
fn conflict_code(msg: &str) -> ErrorCode {
    let lower = msg.to_lowercase();
    if lower.contains("no copies") {
        ErrorCode::NoCopiesAvailable
    } else if lower.contains("loan limit") {
        ErrorCode::LoanLimitReached
    } else if lower.contains("already borrowed") {
        ErrorCode::AlreadyBorrowed
    } else if lower.contains("already returned") {
        ErrorCode::AlreadyReturned
    } else if lower.contains("reservation") && lower.contains("not active") {
        ErrorCode::ReservationNotActive
    } else if lower.contains("active reservation") {
        ErrorCode::DuplicateReservation
    } else if lower.contains("currently available") {
        ErrorCode::BookStillAvailable
    } else {
        ErrorCode::Duplicate
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_codes_map_circulation_messages() {
        assert_eq!(conflict_code("No copies available"), ErrorCode::NoCopiesAvailable);
        assert_eq!(conflict_code("Loan limit reached (5/5)"), ErrorCode::LoanLimitReached);
        assert_eq!(conflict_code("Loan already returned"), ErrorCode::AlreadyReturned);
        assert_eq!(conflict_code("Reservation is not active"), ErrorCode::ReservationNotActive);
    }

    #[test]
    fn pool_timeout_is_transient() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, AppError::Transient(_)));
    }
}
