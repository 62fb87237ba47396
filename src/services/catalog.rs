//! Catalog service: books, authors, categories

use crate::{
    error::AppResult,
    models::{
        author::{Author, AuthorDetails, CreateAuthor},
        book::{Book, BookDetails, CreateBook, UpdateBook},
        category::{Category, CreateCategory},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // ------------------------------------------------------------------
    // Books
    // ------------------------------------------------------------------

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        self.repository.books.get_details(id).await
    }

    pub async fn create_book(&self, book: &CreateBook) -> AppResult<BookDetails> {
        let id = self.repository.books.create(book).await?;
        tracing::info!(book_id = id, title = %book.title, "Book created");
        self.repository.books.get_details(id).await
    }

    pub async fn update_book(&self, id: i32, update: &UpdateBook) -> AppResult<BookDetails> {
        self.repository.books.update(id, update).await?;
        tracing::info!(book_id = id, "Book updated");
        self.repository.books.get_details(id).await
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Authors
    // ------------------------------------------------------------------

    pub async fn list_authors(&self) -> AppResult<Vec<Author>> {
        self.repository.catalog.list_authors().await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<AuthorDetails> {
        self.repository.catalog.get_author(id).await
    }

    pub async fn create_author(&self, author: &CreateAuthor) -> AppResult<AuthorDetails> {
        let id = self.repository.catalog.create_author(author).await?;
        self.repository.catalog.get_author(id).await
    }

    pub async fn update_author(&self, id: i32, author: &CreateAuthor) -> AppResult<AuthorDetails> {
        self.repository.catalog.update_author(id, author).await?;
        self.repository.catalog.get_author(id).await
    }

    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        self.repository.catalog.delete_author(id).await
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.repository.catalog.list_categories().await
    }

    pub async fn create_category(&self, category: &CreateCategory) -> AppResult<i32> {
        self.repository.catalog.create_category(category).await
    }

    pub async fn update_category(&self, id: i32, category: &CreateCategory) -> AppResult<()> {
        self.repository.catalog.update_category(id, category).await
    }

    pub async fn delete_category(&self, id: i32) -> AppResult<()> {
        self.repository.catalog.delete_category(id).await
    }
}
