//! User management endpoints (staff/admin)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::{
        enums::Role,
        user::{UpdateUserRole, UserInfo, UserWithStats},
    },
};

use super::AuthenticatedUser;

/// Role filter for the user listing
#[derive(Deserialize, IntoParams)]
pub struct UsersQuery {
    pub role: Option<Role>,
}

/// List users (admin only)
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(UsersQuery),
    responses(
        (status = 200, description = "Users matching the filter", body = Vec<UserInfo>),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<UsersQuery>,
) -> AppResult<Json<Vec<UserInfo>>> {
    claims.require_admin()?;

    let users = state.services.users.list(query.role).await?;
    Ok(Json(users))
}

/// Get a user with loan statistics (admin only)
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User with statistics", body = UserWithStats),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<UserWithStats>> {
    claims.require_admin()?;

    let user = state.services.users.get_with_stats(id).await?;
    Ok(Json(user))
}

/// Update a user's role (admin only)
#[utoipa::path(
    put,
    path = "/users/{id}/role",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateUserRole,
    responses(
        (status = 200, description = "Role updated"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user_role(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateUserRole>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.users.update_role(id, request.role).await?;
    Ok(StatusCode::OK)
}

/// Delete a user (admin only)
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User has active loans")
    )
)]
pub async fn delete_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
