//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, catalog, health, loans, reports, reservations, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bibliotheca API",
        version = "1.0.0",
        description = "Library Management System REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "Bibliotheca Team", email = "dev@bibliotheca.org")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Authors / categories
        catalog::list_authors,
        catalog::get_author,
        catalog::create_author,
        catalog::update_author,
        catalog::delete_author,
        catalog::list_categories,
        catalog::create_category,
        catalog::update_category,
        catalog::delete_category,
        // Users
        users::list_users,
        users::get_user,
        users::update_user_role,
        users::delete_user,
        // Loans
        loans::borrow_book,
        loans::return_loan,
        loans::my_loans,
        loans::list_loans,
        loans::get_loan,
        // Reservations
        reservations::create_reservation,
        reservations::my_reservations,
        reservations::list_reservations,
        reservations::cancel_reservation,
        // Reports
        reports::most_borrowed,
        reports::overdue,
        reports::member_activity,
        reports::statistics,
        reports::loans_by_date,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            // Books
            crate::models::book::Book,
            crate::models::book::BookDetails,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Authors / categories
            crate::models::author::Author,
            crate::models::author::AuthorBook,
            crate::models::author::AuthorDetails,
            crate::models::author::CreateAuthor,
            crate::models::category::Category,
            crate::models::category::CreateCategory,
            // Users
            crate::models::user::UserInfo,
            crate::models::user::UserLoanStats,
            crate::models::user::UserWithStats,
            crate::models::user::RegisterUser,
            crate::models::user::UpdateUserRole,
            crate::models::enums::Role,
            // Loans
            loans::BorrowRequest,
            crate::models::loan::Loan,
            crate::models::loan::LoanDetails,
            crate::models::loan::ReturnOutcome,
            crate::models::enums::LoanStatus,
            // Reservations
            reservations::ReserveRequest,
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationDetails,
            crate::models::reservation::ReservationReceipt,
            crate::models::enums::ReservationStatus,
            // Reports
            reports::MostBorrowedEntry,
            reports::OverdueEntry,
            reports::MemberActivityEntry,
            reports::LibraryStatistics,
            reports::BookStatistics,
            reports::LoanStatistics,
            reports::ReservationStatistics,
            reports::MemberStatistics,
            reports::FineStatistics,
            reports::LoansByDateEntry,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "books", description = "Book catalog management"),
        (name = "catalog", description = "Authors and categories"),
        (name = "users", description = "User management"),
        (name = "loans", description = "Borrowing and returns"),
        (name = "reservations", description = "Reservation queues"),
        (name = "reports", description = "Reports and statistics")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
