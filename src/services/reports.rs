//! Reporting service: read-only consumers of the circulation data.
//!
//! Reports tolerate slight staleness, so everything here runs as plain
//! pool queries without the engine's row locks.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::Row;

use crate::{
    api::reports::{
        BookStatistics, FineStatistics, LibraryStatistics, LoanStatistics, LoansByDateEntry,
        MemberActivityEntry, MemberStatistics, MostBorrowedEntry, OverdueEntry,
        ReservationStatistics,
    },
    config::LibraryConfig,
    error::AppResult,
    repository::Repository,
};

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
    library: LibraryConfig,
}

impl ReportsService {
    pub fn new(repository: Repository, library: LibraryConfig) -> Self {
        Self { repository, library }
    }

    /// Most borrowed books within the last `days`, best first
    pub async fn most_borrowed(&self, days: i32, limit: i64) -> AppResult<Vec<MostBorrowedEntry>> {
        let entries = sqlx::query_as::<_, MostBorrowedEntry>(
            r#"
            SELECT b.id, b.title, b.isbn, b.total_copies, b.available_copies,
                   COUNT(l.id) AS borrow_count
            FROM books b
            JOIN loans l ON b.id = l.book_id
            WHERE l.borrow_date >= CURRENT_DATE - $1
            GROUP BY b.id
            ORDER BY borrow_count DESC
            LIMIT $2
            "#,
        )
        .bind(days)
        .bind(limit)
        .fetch_all(&self.repository.pool)
        .await?;
        Ok(entries)
    }

    /// Unreturned loans past their due date, worst first, with the fine
    /// they would incur if returned today
    pub async fn overdue_loans(&self) -> AppResult<Vec<OverdueEntry>> {
        let entries = sqlx::query_as::<_, OverdueEntry>(
            r#"
            SELECT l.id AS loan_id, l.user_id, u.name AS user_name, u.email AS user_email,
                   l.book_id, b.title AS book_title,
                   l.borrow_date, l.due_date,
                   (CURRENT_DATE - l.due_date)::bigint AS days_overdue,
                   ROUND((CURRENT_DATE - l.due_date) * $1, 2) AS projected_fine
            FROM loans l
            JOIN users u ON l.user_id = u.id
            JOIN books b ON l.book_id = b.id
            WHERE l.return_date IS NULL AND l.due_date < CURRENT_DATE
            ORDER BY days_overdue DESC
            "#,
        )
        .bind(self.library.fine_per_day)
        .fetch_all(&self.repository.pool)
        .await?;
        Ok(entries)
    }

    /// Per-member loan activity within the last `days`
    pub async fn member_activity(&self, days: i32) -> AppResult<Vec<MemberActivityEntry>> {
        let entries = sqlx::query_as::<_, MemberActivityEntry>(
            r#"
            SELECT u.id, u.name, u.email,
                   COUNT(l.id) AS total_loans,
                   COUNT(l.id) FILTER (WHERE l.return_date IS NULL) AS active_loans,
                   COUNT(l.id) FILTER (WHERE l.return_date IS NULL AND l.due_date < CURRENT_DATE) AS overdue_loans,
                   COALESCE(SUM(l.fine_amount), 0) AS total_fines
            FROM users u
            LEFT JOIN loans l ON u.id = l.user_id AND l.borrow_date >= CURRENT_DATE - $1
            WHERE u.role = 'member'
            GROUP BY u.id
            ORDER BY total_loans DESC
            "#,
        )
        .bind(days)
        .fetch_all(&self.repository.pool)
        .await?;
        Ok(entries)
    }

    /// Whole-library rollup
    pub async fn statistics(&self) -> AppResult<LibraryStatistics> {
        let pool = &self.repository.pool;

        let books = sqlx::query(
            r#"
            SELECT COUNT(*) AS unique_titles,
                   COALESCE(SUM(total_copies), 0)::bigint AS total_copies,
                   COALESCE(SUM(available_copies), 0)::bigint AS available_copies
            FROM books
            "#,
        )
        .fetch_one(pool)
        .await?;

        let unique_titles: i64 = books.get("unique_titles");
        let total_copies: i64 = books.get("total_copies");
        let available_copies: i64 = books.get("available_copies");

        let active_loans: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE return_date IS NULL")
                .fetch_one(pool)
                .await?;

        let overdue_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE return_date IS NULL AND due_date < CURRENT_DATE",
        )
        .fetch_one(pool)
        .await?;

        let active_reservations: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reservations WHERE status = 'active'")
                .fetch_one(pool)
                .await?;

        let total_members: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'member'")
                .fetch_one(pool)
                .await?;

        let collected: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(fine_amount), 0) FROM loans WHERE return_date IS NOT NULL",
        )
        .fetch_one(pool)
        .await?;

        let outstanding: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(ROUND((CURRENT_DATE - due_date) * $1, 2)), 0)
            FROM loans
            WHERE return_date IS NULL AND due_date < CURRENT_DATE
            "#,
        )
        .bind(self.library.fine_per_day)
        .fetch_one(pool)
        .await?;

        Ok(LibraryStatistics {
            books: BookStatistics {
                unique_titles,
                total_copies,
                available_copies,
                borrowed_copies: total_copies - available_copies,
            },
            loans: LoanStatistics {
                active: active_loans,
                overdue: overdue_loans,
            },
            reservations: ReservationStatistics {
                active: active_reservations,
            },
            members: MemberStatistics {
                total: total_members,
            },
            fines: FineStatistics {
                collected,
                outstanding,
            },
        })
    }

    /// Daily loan counts over a date range
    pub async fn loans_by_date(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<Vec<LoansByDateEntry>> {
        let entries = sqlx::query_as::<_, LoansByDateEntry>(
            r#"
            SELECT l.borrow_date AS date,
                   COUNT(*) AS loans_count,
                   COUNT(DISTINCT l.user_id) AS unique_users,
                   COUNT(DISTINCT l.book_id) AS unique_books
            FROM loans l
            WHERE l.borrow_date BETWEEN $1 AND $2
            GROUP BY l.borrow_date
            ORDER BY date
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.repository.pool)
        .await?;
        Ok(entries)
    }
}
