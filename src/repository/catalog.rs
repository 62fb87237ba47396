//! Authors and categories repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorBook, AuthorDetails, CreateAuthor},
        category::{Category, CreateCategory},
    },
};

#[derive(Clone)]
pub struct CatalogRepository {
    pool: Pool<Postgres>,
}

impl CatalogRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // ------------------------------------------------------------------
    // Authors
    // ------------------------------------------------------------------

    pub async fn list_authors(&self) -> AppResult<Vec<Author>> {
        let authors = sqlx::query_as::<_, Author>("SELECT * FROM authors ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(authors)
    }

    /// Get author with their books
    pub async fn get_author(&self, id: i32) -> AppResult<AuthorDetails> {
        let author = sqlx::query_as::<_, Author>("SELECT * FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))?;

        let books = sqlx::query_as::<_, AuthorBook>(
            r#"
            SELECT b.id, b.title, b.isbn
            FROM books b
            JOIN book_authors ba ON b.id = ba.book_id
            WHERE ba.author_id = $1
            ORDER BY b.title
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(AuthorDetails { author, books })
    }

    pub async fn create_author(&self, author: &CreateAuthor) -> AppResult<i32> {
        let id: i32 =
            sqlx::query_scalar("INSERT INTO authors (name, biography) VALUES ($1, $2) RETURNING id")
                .bind(&author.name)
                .bind(&author.biography)
                .fetch_one(&self.pool)
                .await?;
        Ok(id)
    }

    pub async fn update_author(&self, id: i32, author: &CreateAuthor) -> AppResult<()> {
        let result = sqlx::query("UPDATE authors SET name = $1, biography = $2 WHERE id = $3")
            .bind(&author.name)
            .bind(&author.biography)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }
        Ok(())
    }

    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        let referenced: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM book_authors WHERE author_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if referenced {
            return Err(AppError::Conflict(
                "Cannot delete author with associated books".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    pub async fn create_category(&self, category: &CreateCategory) -> AppResult<i32> {
        let id: i32 = sqlx::query_scalar("INSERT INTO categories (name) VALUES ($1) RETURNING id")
            .bind(&category.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn update_category(&self, id: i32, category: &CreateCategory) -> AppResult<()> {
        let result = sqlx::query("UPDATE categories SET name = $1 WHERE id = $2")
            .bind(&category.name)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category with id {} not found", id)));
        }
        Ok(())
    }

    pub async fn delete_category(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category with id {} not found", id)));
        }
        Ok(())
    }
}
