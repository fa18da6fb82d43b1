//! Persistence seam for catalog-service.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Author, Book, BookFilter, Librarian, Library, NewBook};

pub use memory::MemoryCatalogStore;
pub use postgres::PgCatalogStore;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    // Authors
    async fn create_author(&self, name: String) -> Result<Author>;
    async fn find_author(&self, id: i64) -> Result<Option<Author>>;
    /// Ordered by id
    async fn list_authors(&self) -> Result<Vec<Author>>;

    // Books
    async fn insert_book(&self, book: NewBook) -> Result<Book>;
    async fn find_book(&self, id: i64) -> Result<Option<Book>>;
    async fn update_book(&self, id: i64, book: NewBook) -> Result<Option<Book>>;
    /// Also drops the book from every library
    async fn delete_book(&self, id: i64) -> Result<bool>;
    async fn list_books(&self, filter: &BookFilter) -> Result<Vec<Book>>;

    // Libraries
    async fn create_library(&self, name: String) -> Result<Library>;
    async fn find_library(&self, id: i64) -> Result<Option<Library>>;
    async fn list_libraries(&self) -> Result<Vec<Library>>;
    /// `true` when the membership did not exist before
    async fn add_library_book(&self, library_id: i64, book_id: i64) -> Result<bool>;
    /// `true` when a membership was removed
    async fn remove_library_book(&self, library_id: i64, book_id: i64) -> Result<bool>;
    /// Ordered by book id
    async fn library_books(&self, library_id: i64) -> Result<Vec<Book>>;

    // Librarians
    async fn find_librarian(&self, library_id: i64) -> Result<Option<Librarian>>;
    /// Replaces any librarian already assigned to the library
    async fn set_librarian(&self, library_id: i64, name: String) -> Result<Librarian>;
}
