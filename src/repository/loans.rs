//! Loans repository: the borrow/return halves of the circulation engine
//! plus loan queries.
//!
//! Borrow and return each run in a single transaction that locks the
//! target book row (SELECT ... FOR UPDATE) before touching
//! available_copies. The availability check and the decrement are a
//! check-then-act pair; without the row lock two borrows of the last
//! copy could both pass the check.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, QueryBuilder, Row, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::LoanStatus,
        loan::{self, Loan, LoanDetails, LoanFilter, ReturnOutcome},
    },
};

/// Bound on how long an engine transaction may wait for a row lock.
/// Exceeding it yields Postgres 55P03, surfaced as AppError::Transient.
const LOCK_TIMEOUT: &str = "3s";

/// Columns shared by every LoanDetails query. Status is derived in SQL:
/// an unreturned loan past its due date reads as 'overdue' regardless of
/// the stored value.
const LOAN_DETAILS_SELECT: &str = r#"
    SELECT l.id, l.user_id, u.name AS user_name, u.email AS user_email,
           l.book_id, b.title AS book_title, b.isbn,
           l.borrow_date, l.due_date, l.return_date,
           CASE WHEN l.return_date IS NULL AND l.due_date < CURRENT_DATE
                THEN 'overdue' ELSE l.status END AS status,
           l.fine_amount,
           CASE WHEN l.return_date IS NULL
                THEN GREATEST(0, CURRENT_DATE - l.due_date)::bigint
                ELSE 0::bigint END AS days_overdue
    FROM loans l
    JOIN users u ON l.user_id = u.id
    JOIN books b ON l.book_id = b.id
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Start an engine transaction with a bounded lock wait.
    async fn begin_locked(&self) -> AppResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}'", LOCK_TIMEOUT))
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    /// Borrow a book: the whole precondition chain and the copy decrement
    /// commit atomically or not at all.
    pub async fn borrow(
        &self,
        user_id: i32,
        book_id: i32,
        loan_duration_days: i64,
        max_loans_per_user: i64,
    ) -> AppResult<Loan> {
        let mut tx = self.begin_locked().await?;

        // Lock the book row before evaluating availability
        let book = sqlx::query(
            "SELECT available_copies FROM books WHERE id = $1 FOR UPDATE",
        )
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        let available: i32 = book.get("available_copies");
        if available <= 0 {
            return Err(AppError::Conflict(
                "No copies available. Reserve this book instead.".to_string(),
            ));
        }

        let active_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND return_date IS NULL",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if active_loans >= max_loans_per_user {
            return Err(AppError::Conflict(format!(
                "Loan limit reached ({}/{})",
                active_loans, max_loans_per_user
            )));
        }

        let already_borrowed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE user_id = $1 AND book_id = $2 AND return_date IS NULL)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if already_borrowed {
            return Err(AppError::Conflict(
                "You have already borrowed this book".to_string(),
            ));
        }

        sqlx::query("UPDATE books SET available_copies = available_copies - 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        let today = Utc::now().date_naive();
        let due_date = today + Duration::days(loan_duration_days);

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (user_id, book_id, borrow_date, due_date, status, fine_amount)
            VALUES ($1, $2, $3, $4, 'active', 0)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(today)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Return a loan: computes the fine, closes the loan, and releases
    /// the copy in one transaction. A second call on the same loan fails
    /// with Conflict and leaves the fine untouched.
    pub async fn return_loan(&self, loan_id: i32, fine_per_day: Decimal) -> AppResult<ReturnOutcome> {
        let mut tx = self.begin_locked().await?;

        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(loan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if loan.return_date.is_some() {
            return Err(AppError::Conflict("Loan already returned".to_string()));
        }

        let today = Utc::now().date_naive();
        let days_late = loan::days_late(loan.due_date, today);
        let fine_amount = loan::fine_for(days_late, fine_per_day);

        sqlx::query(
            "UPDATE loans SET return_date = $1, status = 'returned', fine_amount = $2 WHERE id = $3",
        )
        .bind(today)
        .bind(fine_amount)
        .bind(loan_id)
        .execute(&mut *tx)
        .await?;

        // The UPDATE takes the book row lock itself; clamp at
        // total_copies in case total_copies shrank while the copy was out.
        sqlx::query(
            "UPDATE books SET available_copies = LEAST(available_copies + 1, total_copies) WHERE id = $1",
        )
        .bind(loan.book_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ReturnOutcome {
            loan_id,
            fine_amount,
            days_late,
        })
    }

    /// Get loan details by ID; when owner_id is set, only that user's
    /// loan is visible (members cannot read other people's loans).
    pub async fn get_details(&self, id: i32, owner_id: Option<i32>) -> AppResult<LoanDetails> {
        let mut qb = QueryBuilder::new(LOAN_DETAILS_SELECT);
        qb.push(" WHERE l.id = ").push_bind(id);
        if let Some(owner) = owner_id {
            qb.push(" AND l.user_id = ").push_bind(owner);
        }

        let row = qb
            .build()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;

        Ok(Self::details_from_row(&row))
    }

    /// Active and past loans for one user, newest first
    pub async fn list_for_user(
        &self,
        user_id: i32,
        status: Option<LoanStatus>,
    ) -> AppResult<Vec<LoanDetails>> {
        let filter = LoanFilter {
            status,
            user_id: Some(user_id),
            overdue: None,
        };
        self.list(&filter).await
    }

    /// All loans matching the filter, newest first. Filter values are
    /// always bound parameters.
    pub async fn list(&self, filter: &LoanFilter) -> AppResult<Vec<LoanDetails>> {
        let mut qb = QueryBuilder::new(LOAN_DETAILS_SELECT);
        qb.push(" WHERE 1=1 ");

        if let Some(status) = filter.status {
            qb.push(
                " AND (CASE WHEN l.return_date IS NULL AND l.due_date < CURRENT_DATE \
                  THEN 'overdue' ELSE l.status END) = ",
            )
            .push_bind(status.as_str());
        }
        if let Some(user_id) = filter.user_id {
            qb.push(" AND l.user_id = ").push_bind(user_id);
        }
        if filter.overdue == Some(true) {
            qb.push(" AND l.return_date IS NULL AND l.due_date < CURRENT_DATE ");
        }

        qb.push(" ORDER BY l.borrow_date DESC, l.id DESC ");

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(Self::details_from_row).collect())
    }

    fn details_from_row(row: &sqlx::postgres::PgRow) -> LoanDetails {
        LoanDetails {
            id: row.get("id"),
            user_id: row.get("user_id"),
            user_name: row.get("user_name"),
            user_email: row.get("user_email"),
            book_id: row.get("book_id"),
            book_title: row.get("book_title"),
            isbn: row.get("isbn"),
            borrow_date: row.get("borrow_date"),
            due_date: row.get("due_date"),
            return_date: row.get("return_date"),
            status: row.get("status"),
            fine_amount: row.get("fine_amount"),
            days_overdue: row.get("days_overdue"),
        }
    }
}
