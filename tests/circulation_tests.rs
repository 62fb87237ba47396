//! Circulation engine tests against a live Postgres database.
//!
//! Run with: DATABASE_URL=postgres://... cargo test -- --ignored

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use bibliotheca_server::{
    config::LibraryConfig,
    error::AppError,
    models::enums::{LoanStatus, Role},
    repository::Repository,
    services::circulation::CirculationService,
};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique suffix so tests can share one database
fn unique() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .subsec_nanos();
    format!("{}-{}", nanos, COUNTER.fetch_add(1, Ordering::Relaxed))
}

async fn setup() -> (Pool<Postgres>, Repository, CirculationService) {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(&url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let repository = Repository::new(pool.clone());
    let engine = CirculationService::new(repository.clone(), LibraryConfig::default());
    (pool, repository, engine)
}

async fn create_user(pool: &Pool<Postgres>, role: Role) -> i32 {
    let tag = unique();
    sqlx::query_scalar(
        "INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, 'x', $3) RETURNING id",
    )
    .bind(format!("Test User {}", tag))
    .bind(format!("user-{}@test.invalid", tag))
    .bind(role.as_str())
    .fetch_one(pool)
    .await
    .expect("Failed to create user")
}

async fn create_book(pool: &Pool<Postgres>, total_copies: i32) -> i32 {
    sqlx::query_scalar(
        "INSERT INTO books (isbn, title, total_copies, available_copies) VALUES ($1, $2, $3, $3) RETURNING id",
    )
    .bind(format!("isbn-{}", unique()))
    .bind("Test Book")
    .bind(total_copies)
    .fetch_one(pool)
    .await
    .expect("Failed to create book")
}

async fn available_copies(pool: &Pool<Postgres>, book_id: i32) -> i32 {
    sqlx::query_scalar("SELECT available_copies FROM books WHERE id = $1")
        .bind(book_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read book")
}

async fn active_loans(pool: &Pool<Postgres>, book_id: i32) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE book_id = $1 AND return_date IS NULL")
        .bind(book_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count loans")
}

/// Backdate a loan so a return happens `days` late
async fn backdate_loan(pool: &Pool<Postgres>, loan_id: i32, days: i32) {
    sqlx::query(
        "UPDATE loans SET due_date = CURRENT_DATE - $1, borrow_date = CURRENT_DATE - $1 - 14 WHERE id = $2",
    )
    .bind(days)
    .bind(loan_id)
    .execute(pool)
    .await
    .expect("Failed to backdate loan");
}

#[tokio::test]
#[ignore]
async fn borrow_decrements_and_conserves_copies() {
    let (pool, _repo, engine) = setup().await;
    let user = create_user(&pool, Role::Member).await;
    let book = create_book(&pool, 2).await;

    let loan = engine.borrow(user, book).await.expect("borrow failed");
    assert_eq!(loan.status, LoanStatus::Active);
    assert_eq!(loan.fine_amount, Decimal::ZERO);
    assert_eq!(loan.due_date - loan.borrow_date, chrono::Duration::days(14));

    // active loans + available copies always equals total copies
    let available = available_copies(&pool, book).await;
    let active = active_loans(&pool, book).await;
    assert_eq!(available, 1);
    assert_eq!(active, 1);
    assert_eq!(active + available as i64, 2);
}

#[tokio::test]
#[ignore]
async fn borrow_unknown_book_is_not_found() {
    let (pool, _repo, engine) = setup().await;
    let user = create_user(&pool, Role::Member).await;

    let err = engine.borrow(user, -1).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
#[ignore]
async fn concurrent_borrows_of_last_copy_yield_one_loan() {
    let (pool, _repo, engine) = setup().await;
    let book = create_book(&pool, 1).await;

    let mut users = Vec::new();
    for _ in 0..8 {
        users.push(create_user(&pool, Role::Member).await);
    }

    let mut handles = Vec::new();
    for user in users {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move { engine.borrow(user, book).await }));
    }

    let mut successes = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => successes += 1,
            Err(AppError::Conflict(msg)) => {
                assert!(msg.to_lowercase().contains("no copies"));
                conflicts += 1;
            }
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(available_copies(&pool, book).await, 0);
    assert_eq!(active_loans(&pool, book).await, 1);
}

#[tokio::test]
#[ignore]
async fn return_is_idempotent_and_fines_late_loans() {
    let (pool, _repo, engine) = setup().await;
    let user = create_user(&pool, Role::Member).await;
    let book = create_book(&pool, 1).await;

    let loan = engine.borrow(user, book).await.expect("borrow failed");
    backdate_loan(&pool, loan.id, 20).await;

    let outcome = engine.return_loan(loan.id).await.expect("return failed");
    assert_eq!(outcome.days_late, 20);
    assert_eq!(outcome.fine_amount, Decimal::new(1000, 2)); // 20 * 0.50
    assert_eq!(available_copies(&pool, book).await, 1);

    // Second return fails and the recorded fine is unchanged
    let err = engine.return_loan(loan.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let fine: Decimal = sqlx::query_scalar("SELECT fine_amount FROM loans WHERE id = $1")
        .bind(loan.id)
        .fetch_one(&pool)
        .await
        .expect("Failed to read loan");
    assert_eq!(fine, Decimal::new(1000, 2));
    assert_eq!(available_copies(&pool, book).await, 1);
}

#[tokio::test]
#[ignore]
async fn on_time_return_has_no_fine() {
    let (pool, _repo, engine) = setup().await;
    let user = create_user(&pool, Role::Member).await;
    let book = create_book(&pool, 1).await;

    let loan = engine.borrow(user, book).await.expect("borrow failed");
    let outcome = engine.return_loan(loan.id).await.expect("return failed");

    assert_eq!(outcome.days_late, 0);
    assert_eq!(outcome.fine_amount, Decimal::ZERO.round_dp(2));
}

#[tokio::test]
#[ignore]
async fn loan_limit_is_enforced() {
    let (pool, _repo, engine) = setup().await;
    let user = create_user(&pool, Role::Member).await;

    for _ in 0..5 {
        let book = create_book(&pool, 1).await;
        engine.borrow(user, book).await.expect("borrow failed");
    }

    let sixth = create_book(&pool, 1).await;
    let err = engine.borrow(user, sixth).await.unwrap_err();
    match err {
        AppError::Conflict(msg) => assert!(msg.contains("Loan limit reached")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(available_copies(&pool, sixth).await, 1);
}

#[tokio::test]
#[ignore]
async fn duplicate_borrow_of_same_book_is_rejected() {
    let (pool, _repo, engine) = setup().await;
    let user = create_user(&pool, Role::Member).await;
    let book = create_book(&pool, 3).await;

    engine.borrow(user, book).await.expect("borrow failed");
    let err = engine.borrow(user, book).await.unwrap_err();
    match err {
        AppError::Conflict(msg) => assert!(msg.contains("already borrowed")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(available_copies(&pool, book).await, 2);
}

#[tokio::test]
#[ignore]
async fn reserve_requires_exhausted_availability() {
    let (pool, _repo, engine) = setup().await;
    let user = create_user(&pool, Role::Member).await;
    let book = create_book(&pool, 1).await;

    let err = engine.reserve(user, book).await.unwrap_err();
    match err {
        AppError::Conflict(msg) => assert!(msg.contains("available")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
#[ignore]
async fn reservation_queue_keeps_fifo_order_across_cancellations() {
    let (pool, repo, engine) = setup().await;
    let borrower = create_user(&pool, Role::Member).await;
    let book = create_book(&pool, 1).await;
    engine.borrow(borrower, book).await.expect("borrow failed");

    let first = create_user(&pool, Role::Member).await;
    let second = create_user(&pool, Role::Member).await;
    let third = create_user(&pool, Role::Member).await;

    let r1 = engine.reserve(first, book).await.expect("reserve failed");
    let r2 = engine.reserve(second, book).await.expect("reserve failed");
    let r3 = engine.reserve(third, book).await.expect("reserve failed");
    assert_eq!(r1.queue_position, 1);
    assert_eq!(r2.queue_position, 2);
    assert_eq!(r3.queue_position, 3);

    // Cancelling the middle reservation moves later ones up but never
    // reorders earlier-vs-later
    engine
        .cancel_reservation(r2.reservation_id, second, Role::Member)
        .await
        .expect("cancel failed");

    let positions = repo
        .reservations
        .list_for_user(third)
        .await
        .expect("list failed");
    let third_pos = positions
        .iter()
        .find(|r| r.id == r3.reservation_id)
        .and_then(|r| r.queue_position)
        .expect("no position");
    assert_eq!(third_pos, 2);

    let first_pos = repo
        .reservations
        .list_for_user(first)
        .await
        .expect("list failed")
        .into_iter()
        .find(|r| r.id == r1.reservation_id)
        .and_then(|r| r.queue_position)
        .expect("no position");
    assert_eq!(first_pos, 1);
}

#[tokio::test]
#[ignore]
async fn duplicate_reservation_is_rejected() {
    let (pool, _repo, engine) = setup().await;
    let borrower = create_user(&pool, Role::Member).await;
    let book = create_book(&pool, 1).await;
    engine.borrow(borrower, book).await.expect("borrow failed");

    let user = create_user(&pool, Role::Member).await;
    engine.reserve(user, book).await.expect("reserve failed");
    let err = engine.reserve(user, book).await.unwrap_err();
    match err {
        AppError::Conflict(msg) => assert!(msg.contains("active reservation")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
#[ignore]
async fn members_cancel_only_their_own_reservations() {
    let (pool, _repo, engine) = setup().await;
    let borrower = create_user(&pool, Role::Member).await;
    let book = create_book(&pool, 1).await;
    engine.borrow(borrower, book).await.expect("borrow failed");

    let holder = create_user(&pool, Role::Member).await;
    let stranger = create_user(&pool, Role::Member).await;
    let librarian = create_user(&pool, Role::Librarian).await;

    let receipt = engine.reserve(holder, book).await.expect("reserve failed");

    let err = engine
        .cancel_reservation(receipt.reservation_id, stranger, Role::Member)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    // Staff can cancel anyone's reservation; a second cancel conflicts
    engine
        .cancel_reservation(receipt.reservation_id, librarian, Role::Librarian)
        .await
        .expect("staff cancel failed");

    let err = engine
        .cancel_reservation(receipt.reservation_id, holder, Role::Member)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
#[ignore]
async fn two_copy_walkthrough() {
    let (pool, _repo, engine) = setup().await;
    let book = create_book(&pool, 2).await;
    let user_a = create_user(&pool, Role::Member).await;
    let user_b = create_user(&pool, Role::Member).await;
    let user_c = create_user(&pool, Role::Member).await;

    let loan_a = engine.borrow(user_a, book).await.expect("A borrow failed");
    assert_eq!(available_copies(&pool, book).await, 1);
    assert_eq!(loan_a.status, LoanStatus::Active);

    engine.borrow(user_b, book).await.expect("B borrow failed");
    assert_eq!(available_copies(&pool, book).await, 0);

    let err = engine.borrow(user_c, book).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let receipt = engine.reserve(user_c, book).await.expect("C reserve failed");
    assert_eq!(receipt.queue_position, 1);

    backdate_loan(&pool, loan_a.id, 20).await;
    let outcome = engine.return_loan(loan_a.id).await.expect("return failed");
    assert_eq!(outcome.fine_amount, Decimal::new(1000, 2));
    assert_eq!(available_copies(&pool, book).await, 1);

    // The reservation is advisory: no loan was created for C on return
    assert_eq!(active_loans(&pool, book).await, 1);
}

#[tokio::test]
#[ignore]
async fn total_copies_change_rederives_availability() {
    let (pool, repo, engine) = setup().await;
    let book = create_book(&pool, 2).await;
    let user = create_user(&pool, Role::Member).await;

    let loan = engine.borrow(user, book).await.expect("borrow failed");
    assert_eq!(available_copies(&pool, book).await, 1);

    let grow = bibliotheca_server::models::book::UpdateBook {
        isbn: None,
        title: None,
        description: None,
        publisher: None,
        publication_year: None,
        total_copies: Some(5),
        author_ids: None,
        category_ids: None,
    };
    repo.books.update(book, &grow).await.expect("update failed");
    assert_eq!(available_copies(&pool, book).await, 4);

    let shrink = bibliotheca_server::models::book::UpdateBook {
        total_copies: Some(1),
        ..grow
    };
    repo.books.update(book, &shrink).await.expect("update failed");
    assert_eq!(available_copies(&pool, book).await, 0);

    // Returning the outstanding copy clamps at the new total
    engine.return_loan(loan.id).await.expect("return failed");
    assert_eq!(available_copies(&pool, book).await, 1);
}
