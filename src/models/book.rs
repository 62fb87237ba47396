//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::author::Author;
use super::category::Category;

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub isbn: String,
    pub title: String,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i16>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// Copies currently out on loan.
    pub fn copies_in_circulation(&self) -> i32 {
        self.total_copies - self.available_copies
    }
}

/// Book with its authors and categories for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub authors: Vec<Author>,
    pub categories: Vec<Category>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 10, max = 17, message = "ISBN must be 10-17 characters"))]
    pub isbn: String,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i16>,
    #[validate(range(min = 0, message = "total_copies must be >= 0"))]
    pub total_copies: i32,
    #[validate(length(min = 1, message = "At least one author is required"))]
    pub author_ids: Vec<i32>,
    #[serde(default)]
    pub category_ids: Vec<i32>,
}

/// Update book request (partial)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 10, max = 17, message = "ISBN must be 10-17 characters"))]
    pub isbn: Option<String>,
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i16>,
    #[validate(range(min = 0, message = "total_copies must be >= 0"))]
    pub total_copies: Option<i32>,
    pub author_ids: Option<Vec<i32>>,
    pub category_ids: Option<Vec<i32>>,
}
