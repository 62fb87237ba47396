//! Circulation engine: borrow, return, reserve, cancel.
//!
//! Each operation is one atomic unit of work against the book row and
//! the loan/reservation tables; the transactional SQL lives in the
//! loans/reservations repositories, this service carries the configured
//! business rules and exposes the read paths.

use crate::{
    config::LibraryConfig,
    error::AppResult,
    models::{
        enums::{LoanStatus, Role},
        loan::{Loan, LoanDetails, LoanFilter, ReturnOutcome},
        reservation::{ReservationDetails, ReservationFilter, ReservationReceipt},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    library: LibraryConfig,
}

impl CirculationService {
    pub fn new(repository: Repository, library: LibraryConfig) -> Self {
        Self { repository, library }
    }

    /// Borrow a book for a user
    pub async fn borrow(&self, user_id: i32, book_id: i32) -> AppResult<Loan> {
        // Verify user exists
        self.repository.users.get_by_id(user_id).await?;

        let loan = self
            .repository
            .loans
            .borrow(
                user_id,
                book_id,
                self.library.loan_duration_days,
                self.library.max_loans_per_user,
            )
            .await?;

        tracing::info!(
            loan_id = loan.id,
            user_id,
            book_id,
            due_date = %loan.due_date,
            "Book borrowed"
        );
        Ok(loan)
    }

    /// Return a borrowed book, computing the fine at the configured rate
    pub async fn return_loan(&self, loan_id: i32) -> AppResult<ReturnOutcome> {
        let outcome = self
            .repository
            .loans
            .return_loan(loan_id, self.library.fine_per_day)
            .await?;

        tracing::info!(
            loan_id,
            days_late = outcome.days_late,
            fine = %outcome.fine_amount,
            "Book returned"
        );
        Ok(outcome)
    }

    /// Reserve a book that has no available copies
    pub async fn reserve(&self, user_id: i32, book_id: i32) -> AppResult<ReservationReceipt> {
        self.repository.users.get_by_id(user_id).await?;

        let receipt = self.repository.reservations.reserve(user_id, book_id).await?;

        tracing::info!(
            reservation_id = receipt.reservation_id,
            user_id,
            book_id,
            position = receipt.queue_position,
            "Reservation placed"
        );
        Ok(receipt)
    }

    /// Cancel a reservation on behalf of the acting user
    pub async fn cancel_reservation(
        &self,
        reservation_id: i32,
        actor_user_id: i32,
        actor_role: Role,
    ) -> AppResult<()> {
        self.repository
            .reservations
            .cancel(reservation_id, actor_user_id, actor_role)
            .await?;

        tracing::info!(reservation_id, actor_user_id, "Reservation cancelled");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read paths
    // ------------------------------------------------------------------

    /// Loans for one user, optionally by (effective) status
    pub async fn user_loans(
        &self,
        user_id: i32,
        status: Option<LoanStatus>,
    ) -> AppResult<Vec<LoanDetails>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.loans.list_for_user(user_id, status).await
    }

    /// All loans matching the filter (staff view)
    pub async fn loans(&self, filter: &LoanFilter) -> AppResult<Vec<LoanDetails>> {
        self.repository.loans.list(filter).await
    }

    /// One loan; members only see their own
    pub async fn loan(&self, loan_id: i32, owner_id: Option<i32>) -> AppResult<LoanDetails> {
        self.repository.loans.get_details(loan_id, owner_id).await
    }

    /// Reservations for one user with computed queue positions
    pub async fn user_reservations(&self, user_id: i32) -> AppResult<Vec<ReservationDetails>> {
        self.repository.reservations.list_for_user(user_id).await
    }

    /// All reservations matching the filter (staff view)
    pub async fn reservations(
        &self,
        filter: &ReservationFilter,
    ) -> AppResult<Vec<ReservationDetails>> {
        self.repository.reservations.list(filter).await
    }
}
