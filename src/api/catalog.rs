//! Author and category endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorDetails, CreateAuthor},
        category::{Category, CreateCategory},
    },
};

use super::AuthenticatedUser;

// ---------------------------------------------------------------------------
// Authors
// ---------------------------------------------------------------------------

/// List all authors
#[utoipa::path(
    get,
    path = "/authors",
    tag = "catalog",
    responses(
        (status = 200, description = "All authors", body = Vec<Author>)
    )
)]
pub async fn list_authors(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Author>>> {
    let authors = state.services.catalog.list_authors().await?;
    Ok(Json(authors))
}

/// Get an author with their books
#[utoipa::path(
    get,
    path = "/authors/{id}",
    tag = "catalog",
    params(
        ("id" = i32, Path, description = "Author ID")
    ),
    responses(
        (status = 200, description = "Author details", body = AuthorDetails),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<AuthorDetails>> {
    let author = state.services.catalog.get_author(id).await?;
    Ok(Json(author))
}

/// Create an author (librarian/admin)
#[utoipa::path(
    post,
    path = "/authors",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body = CreateAuthor,
    responses(
        (status = 201, description = "Author created", body = AuthorDetails),
        (status = 403, description = "Staff role required")
    )
)]
pub async fn create_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateAuthor>,
) -> AppResult<(StatusCode, Json<AuthorDetails>)> {
    claims.require_staff()?;
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let author = state.services.catalog.create_author(&request).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

/// Update an author (librarian/admin)
#[utoipa::path(
    put,
    path = "/authors/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Author ID")
    ),
    request_body = CreateAuthor,
    responses(
        (status = 200, description = "Author updated", body = AuthorDetails),
        (status = 403, description = "Staff role required"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<CreateAuthor>,
) -> AppResult<Json<AuthorDetails>> {
    claims.require_staff()?;
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let author = state.services.catalog.update_author(id, &request).await?;
    Ok(Json(author))
}

/// Delete an author (admin only)
#[utoipa::path(
    delete,
    path = "/authors/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Author ID")
    ),
    responses(
        (status = 204, description = "Author deleted"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Author not found"),
        (status = 409, description = "Author has associated books")
    )
)]
pub async fn delete_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.catalog.delete_author(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// List all categories
#[utoipa::path(
    get,
    path = "/categories",
    tag = "catalog",
    responses(
        (status = 200, description = "All categories", body = Vec<Category>)
    )
)]
pub async fn list_categories(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<Category>>> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(Json(categories))
}

/// Create a category (librarian/admin)
#[utoipa::path(
    post,
    path = "/categories",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body = CreateCategory,
    responses(
        (status = 201, description = "Category created"),
        (status = 403, description = "Staff role required")
    )
)]
pub async fn create_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateCategory>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    claims.require_staff()?;
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let id = state.services.catalog.create_category(&request).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Update a category (librarian/admin)
#[utoipa::path(
    put,
    path = "/categories/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    request_body = CreateCategory,
    responses(
        (status = 200, description = "Category updated"),
        (status = 403, description = "Staff role required"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn update_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<CreateCategory>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state.services.catalog.update_category(id, &request).await?;
    Ok(StatusCode::OK)
}

/// Delete a category (admin only)
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn delete_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.catalog.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
