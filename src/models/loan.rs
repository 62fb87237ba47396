//! Loan (borrow) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::enums::LoanStatus;

/// Whole days between due date and today, floored at zero.
pub fn days_late(due_date: NaiveDate, today: NaiveDate) -> i64 {
    (today - due_date).num_days().max(0)
}

/// Fine owed for a loan returned `days_late` days past its due date,
/// rounded to cents.
pub fn fine_for(days_late: i64, fine_per_day: Decimal) -> Decimal {
    (Decimal::from(days_late.max(0)) * fine_per_day).round_dp(2)
}

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: LoanStatus,
    pub fine_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Loan {
    /// Whole days past the due date, zero when returned or not yet due.
    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        if self.return_date.is_some() {
            return 0;
        }
        days_late(self.due_date, today)
    }

    /// Status as displayed: "overdue" is derived, never trusted from storage.
    pub fn effective_status(&self, today: NaiveDate) -> LoanStatus {
        if self.return_date.is_none() && self.due_date < today {
            LoanStatus::Overdue
        } else {
            self.status
        }
    }
}

/// Loan with book (and optionally borrower) context for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub user_id: i32,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub book_id: i32,
    pub book_title: String,
    pub isbn: String,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: LoanStatus,
    pub fine_amount: Decimal,
    pub days_overdue: i64,
}

/// Result of returning a loan
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReturnOutcome {
    pub loan_id: i32,
    pub fine_amount: Decimal,
    pub days_late: i64,
}

/// Typed filter for loan listings. Every value is bound as a query
/// parameter, never interpolated into SQL text.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct LoanFilter {
    pub status: Option<LoanStatus>,
    pub user_id: Option<i32>,
    pub overdue: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loan(due: NaiveDate, returned: Option<NaiveDate>, status: LoanStatus) -> Loan {
        Loan {
            id: 1,
            user_id: 1,
            book_id: 1,
            borrow_date: due - chrono::Duration::days(14),
            due_date: due,
            return_date: returned,
            status,
            fine_amount: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn days_overdue_is_floored_at_zero() {
        let due = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let l = loan(due, None, LoanStatus::Active);
        assert_eq!(l.days_overdue(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()), 0);
        assert_eq!(l.days_overdue(due), 0);
        assert_eq!(l.days_overdue(NaiveDate::from_ymd_opt(2024, 6, 20).unwrap()), 5);
    }

    #[test]
    fn returned_loan_is_never_overdue() {
        let due = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let returned = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let l = loan(due, Some(returned), LoanStatus::Returned);
        assert_eq!(l.days_overdue(NaiveDate::from_ymd_opt(2024, 7, 10).unwrap()), 0);
        assert_eq!(
            l.effective_status(NaiveDate::from_ymd_opt(2024, 7, 10).unwrap()),
            LoanStatus::Returned
        );
    }

    #[test]
    fn stored_active_reads_as_overdue_past_due() {
        let due = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let l = loan(due, None, LoanStatus::Active);
        assert_eq!(
            l.effective_status(NaiveDate::from_ymd_opt(2024, 6, 16).unwrap()),
            LoanStatus::Overdue
        );
        assert_eq!(l.effective_status(due), LoanStatus::Active);
    }

    #[test]
    fn fine_is_rate_times_days() {
        let rate = Decimal::new(50, 2); // 0.50
        assert_eq!(fine_for(20, rate).to_string(), "10.00");
        assert_eq!(fine_for(1, rate).to_string(), "0.50");
        assert_eq!(fine_for(0, rate), Decimal::ZERO.round_dp(2));
        assert_eq!(fine_for(-3, rate), Decimal::ZERO.round_dp(2));
    }

    #[test]
    fn fine_rounds_to_cents() {
        let rate = Decimal::new(333, 3); // 0.333/day
        assert_eq!(fine_for(3, rate).to_string(), "1.00");
    }
}
