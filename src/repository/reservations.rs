//! Reservations repository: the reserve/cancel halves of the
//! circulation engine plus queue queries.
//!
//! Queue position is never stored. It is always computed as
//! 1 + count(active reservations for the same book with strictly
//! earlier reserved_at), so cancellations need no compaction.

use sqlx::{Pool, Postgres, QueryBuilder, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{ReservationStatus, Role},
        reservation::{Reservation, ReservationDetails, ReservationFilter, ReservationReceipt},
    },
};

const LOCK_TIMEOUT: &str = "3s";

const RESERVATION_DETAILS_SELECT: &str = r#"
    SELECT r.id, r.user_id, u.name AS user_name, u.email AS user_email,
           r.book_id, b.title AS book_title, b.isbn, r.reserved_at, r.status,
           CASE WHEN r.status = 'active' THEN
               (SELECT COUNT(*) + 1
                FROM reservations r2
                WHERE r2.book_id = r.book_id
                  AND r2.status = 'active'
                  AND r2.reserved_at < r.reserved_at)
           END AS queue_position
    FROM reservations r
    JOIN users u ON r.user_id = u.id
    JOIN books b ON r.book_id = b.id
"#;

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Place a reservation. Only valid while no copies are available;
    /// the book row is locked so a concurrent return/borrow cannot
    /// change availability mid-check.
    pub async fn reserve(&self, user_id: i32, book_id: i32) -> AppResult<ReservationReceipt> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}'", LOCK_TIMEOUT))
            .execute(&mut *tx)
            .await?;

        let book = sqlx::query("SELECT available_copies FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        let available: i32 = book.get("available_copies");
        if available > 0 {
            return Err(AppError::Conflict(
                "Book is currently available. Borrow it instead.".to_string(),
            ));
        }

        let duplicate: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM reservations WHERE user_id = $1 AND book_id = $2 AND status = 'active')",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if duplicate {
            return Err(AppError::Conflict(
                "You already have an active reservation for this book".to_string(),
            ));
        }

        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (user_id, book_id, status)
            VALUES ($1, $2, 'active')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        let queue_position: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) + 1
            FROM reservations
            WHERE book_id = $1 AND status = 'active' AND reserved_at < $2
            "#,
        )
        .bind(book_id)
        .bind(reservation.reserved_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ReservationReceipt {
            reservation_id: reservation.id,
            queue_position,
        })
    }

    /// Cancel a reservation. Members may only cancel their own; staff
    /// may cancel any. Positions behind the cancelled row shift down on
    /// the next read without any row rewrites.
    pub async fn cancel(
        &self,
        reservation_id: i32,
        actor_user_id: i32,
        actor_role: Role,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}'", LOCK_TIMEOUT))
            .execute(&mut *tx)
            .await?;

        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE id = $1 FOR UPDATE",
        )
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Reservation with id {} not found", reservation_id))
        })?;

        if actor_role == Role::Member && reservation.user_id != actor_user_id {
            return Err(AppError::Authorization(
                "You can only cancel your own reservations".to_string(),
            ));
        }

        if reservation.status != ReservationStatus::Active {
            return Err(AppError::Conflict("Reservation is not active".to_string()));
        }

        sqlx::query("UPDATE reservations SET status = 'cancelled' WHERE id = $1")
            .bind(reservation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// All reservations for one user, newest first
    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<ReservationDetails>> {
        let mut qb = QueryBuilder::new(RESERVATION_DETAILS_SELECT);
        qb.push(" WHERE r.user_id = ").push_bind(user_id);
        qb.push(" ORDER BY r.reserved_at DESC ");

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(Self::details_from_row).collect())
    }

    /// All reservations matching the filter, grouped by book in queue order
    pub async fn list(&self, filter: &ReservationFilter) -> AppResult<Vec<ReservationDetails>> {
        let mut qb = QueryBuilder::new(RESERVATION_DETAILS_SELECT);
        qb.push(" WHERE 1=1 ");

        if let Some(book_id) = filter.book_id {
            qb.push(" AND r.book_id = ").push_bind(book_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND r.status = ").push_bind(status.as_str());
        }

        qb.push(" ORDER BY r.book_id, r.reserved_at ");

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(Self::details_from_row).collect())
    }

    fn details_from_row(row: &sqlx::postgres::PgRow) -> ReservationDetails {
        ReservationDetails {
            id: row.get("id"),
            user_id: row.get("user_id"),
            user_name: row.get("user_name"),
            user_email: row.get("user_email"),
            book_id: row.get("book_id"),
            book_title: row.get("book_title"),
            isbn: row.get("isbn"),
            reserved_at: row.get("reserved_at"),
            status: row.get("status"),
            queue_position: row.get("queue_position"),
        }
    }
}
