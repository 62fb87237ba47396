//! Bibliotheca Server - Library Management System
//!
//! REST API server for library catalog, circulation, and reporting.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bibliotheca_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("bibliotheca_server={},tower_http=debug", config.logging.level).into()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Bibliotheca Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(repository, config.auth.clone(), config.library.clone());

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/register", post(api::auth::register))
        .route("/auth/login", post(api::auth::login))
        .route("/auth/me", get(api::auth::me))
        // Books
        .route("/books", get(api::books::list_books))
        .route("/books", post(api::books::create_book))
        .route("/books/:id", get(api::books::get_book))
        .route("/books/:id", put(api::books::update_book))
        .route("/books/:id", delete(api::books::delete_book))
        // Authors
        .route("/authors", get(api::catalog::list_authors))
        .route("/authors", post(api::catalog::create_author))
        .route("/authors/:id", get(api::catalog::get_author))
        .route("/authors/:id", put(api::catalog::update_author))
        .route("/authors/:id", delete(api::catalog::delete_author))
        // Categories
        .route("/categories", get(api::catalog::list_categories))
        .route("/categories", post(api::catalog::create_category))
        .route("/categories/:id", put(api::catalog::update_category))
        .route("/categories/:id", delete(api::catalog::delete_category))
        // Users
        .route("/users", get(api::users::list_users))
        .route("/users/:id", get(api::users::get_user))
        .route("/users/:id/role", put(api::users::update_user_role))
        .route("/users/:id", delete(api::users::delete_user))
        // Loans (circulation engine)
        .route("/loans", post(api::loans::borrow_book))
        .route("/loans/:id/return", post(api::loans::return_loan))
        .route("/loans/my-loans", get(api::loans::my_loans))
        .route("/loans", get(api::loans::list_loans))
        .route("/loans/:id", get(api::loans::get_loan))
        // Reservations (circulation engine)
        .route("/reservations", post(api::reservations::create_reservation))
        .route(
            "/reservations/my-reservations",
            get(api::reservations::my_reservations),
        )
        .route("/reservations", get(api::reservations::list_reservations))
        .route(
            "/reservations/:id",
            delete(api::reservations::cancel_reservation),
        )
        // Reports
        .route("/reports/most-borrowed", get(api::reports::most_borrowed))
        .route("/reports/overdue", get(api::reports::overdue))
        .route("/reports/member-activity", get(api::reports::member_activity))
        .route("/reports/statistics", get(api::reports::statistics))
        .route("/reports/loans-by-date", get(api::reports::loans_by_date))
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
