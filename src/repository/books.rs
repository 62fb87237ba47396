//! Books repository for catalog database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        author::Author,
        book::{Book, BookDetails, CreateBook, UpdateBook},
        category::Category,
    },
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Get book with its authors and categories
    pub async fn get_details(&self, id: i32) -> AppResult<BookDetails> {
        let book = self.get_by_id(id).await?;

        let authors = sqlx::query_as::<_, Author>(
            r#"
            SELECT a.* FROM authors a
            JOIN book_authors ba ON ba.author_id = a.id
            WHERE ba.book_id = $1
            ORDER BY a.name
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT c.* FROM categories c
            JOIN book_categories bc ON bc.category_id = c.id
            WHERE bc.book_id = $1
            ORDER BY c.name
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(BookDetails {
            book,
            authors,
            categories,
        })
    }

    /// List all books ordered by title
    pub async fn list(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY title")
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    /// Create a book with its author/category links. A new book starts
    /// with every copy available.
    pub async fn create(&self, book: &CreateBook) -> AppResult<i32> {
        let mut tx = self.pool.begin().await?;

        let book_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO books (isbn, title, description, publisher, publication_year,
                               total_copies, available_copies)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING id
            "#,
        )
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.description)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(book.total_copies)
        .fetch_one(&mut *tx)
        .await?;

        for author_id in &book.author_ids {
            sqlx::query("INSERT INTO book_authors (book_id, author_id) VALUES ($1, $2)")
                .bind(book_id)
                .bind(author_id)
                .execute(&mut *tx)
                .await?;
        }

        for category_id in &book.category_ids {
            sqlx::query("INSERT INTO book_categories (book_id, category_id) VALUES ($1, $2)")
                .bind(book_id)
                .bind(category_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(book_id)
    }

    /// Update a book. When total_copies changes, available_copies is
    /// re-derived as max(0, total - copies currently on loan) under the
    /// book row lock, so the circulation invariant holds against
    /// concurrent borrows and returns.
    pub async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let available_copies = if let Some(new_total) = update.total_copies {
            let on_loan: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND return_date IS NULL",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            (new_total as i64 - on_loan).max(0) as i32
        } else {
            existing.available_copies
        };

        sqlx::query(
            r#"
            UPDATE books
            SET isbn = COALESCE($1, isbn),
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                publisher = COALESCE($4, publisher),
                publication_year = COALESCE($5, publication_year),
                total_copies = COALESCE($6, total_copies),
                available_copies = $7
            WHERE id = $8
            "#,
        )
        .bind(&update.isbn)
        .bind(&update.title)
        .bind(&update.description)
        .bind(&update.publisher)
        .bind(update.publication_year)
        .bind(update.total_copies)
        .bind(available_copies)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(ref author_ids) = update.author_ids {
            sqlx::query("DELETE FROM book_authors WHERE book_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for author_id in author_ids {
                sqlx::query("INSERT INTO book_authors (book_id, author_id) VALUES ($1, $2)")
                    .bind(id)
                    .bind(author_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        if let Some(ref category_ids) = update.category_ids {
            sqlx::query("DELETE FROM book_categories WHERE book_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for category_id in category_ids {
                sqlx::query("INSERT INTO book_categories (book_id, category_id) VALUES ($1, $2)")
                    .bind(id)
                    .bind(category_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete a book. Refused while copies are out on loan.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let active_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND return_date IS NULL",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if active_loans > 0 {
            return Err(AppError::Conflict(
                "Cannot delete book with active loans".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        Ok(())
    }
}
