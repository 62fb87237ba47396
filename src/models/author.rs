//! Author model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Author model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub name: String,
    pub biography: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Create/update author request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAuthor {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub biography: Option<String>,
}

/// Short book reference listed under an author
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuthorBook {
    pub id: i32,
    pub title: String,
    pub isbn: String,
}

/// Author with their books
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorDetails {
    #[serde(flatten)]
    pub author: Author,
    pub books: Vec<AuthorBook>,
}
