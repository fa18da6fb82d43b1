//! Catalog operations: books, authors, libraries and their librarians.
//!
//! Reads are public. Writes take the authenticated caller, which the
//! handlers obtain through the `AuthUser` extractor (401 when absent).

use actix_middleware::AuthUser;
use agora_common::validation::{trimmed, trimmed_opt};
use agora_common::{FieldErrors, SearchTerm};
use chrono::Datelike;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::{
    AuthorView, Book, BookFilter, BookOrdering, Librarian, Library, LibraryView, NewBook,
};
use crate::repository::CatalogStore;

pub const FUTURE_YEAR: &str = "publication year cannot be greater than current year";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BookInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "agora_common::validation::non_blank"), length(max = 200))]
    pub title: String,
    pub publication_year: i32,
    pub author: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookPatch {
    #[serde(default, deserialize_with = "trimmed_opt")]
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    pub author: Option<i64>,
}

impl BookPatch {
    fn apply(self, current: Book) -> BookInput {
        BookInput {
            title: self.title.unwrap_or(current.title),
            publication_year: self.publication_year.unwrap_or(current.publication_year),
            author: self.author.unwrap_or(current.author_id),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookQuery {
    pub title: Option<String>,
    pub author: Option<i64>,
    pub publication_year: Option<i32>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl From<BookQuery> for BookFilter {
    fn from(query: BookQuery) -> Self {
        BookFilter {
            title: query.title,
            author_id: query.author,
            publication_year: query.publication_year,
            search: SearchTerm::parse(query.search.as_deref()),
            ordering: BookOrdering::parse(query.ordering.as_deref()),
        }
    }
}

/// Body shared by author, library and librarian creation
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NameInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "agora_common::validation::non_blank"), length(max = 100))]
    pub name: String,
}

fn current_year() -> i32 {
    chrono::Utc::now().year()
}

/// Field checks for a full book body. Every failing field is reported.
fn check_book(input: &BookInput, current_year: i32) -> std::result::Result<(), FieldErrors> {
    let mut errors = match input.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => e.into(),
    };
    if input.publication_year > current_year {
        errors.add("publication_year", FUTURE_YEAR);
    }
    errors.into_result()
}

#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn CatalogStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn list_books(&self, query: BookQuery) -> Result<Vec<Book>> {
        self.store.list_books(&query.into()).await
    }

    pub async fn get_book(&self, id: i64) -> Result<Book> {
        self.store
            .find_book(id)
            .await?
            .ok_or_else(|| AppError::not_found("Book"))
    }

    pub async fn create_book(&self, user: &AuthUser, input: BookInput) -> Result<Book> {
        let book = self.validated(input).await?;
        let book = self.store.insert_book(book).await?;
        tracing::info!(book_id = book.id, user_id = user.id, "book created");
        Ok(book)
    }

    /// PUT: every field is required
    pub async fn replace_book(&self, user: &AuthUser, id: i64, input: BookInput) -> Result<Book> {
        self.get_book(id).await?;
        let book = self.validated(input).await?;
        self.save(user, id, book).await
    }

    /// PATCH: missing fields keep their stored values
    pub async fn update_book(&self, user: &AuthUser, id: i64, patch: BookPatch) -> Result<Book> {
        let current = self.get_book(id).await?;
        let book = self.validated(patch.apply(current)).await?;
        self.save(user, id, book).await
    }

    pub async fn delete_book(&self, user: &AuthUser, id: i64) -> Result<()> {
        if !self.store.delete_book(id).await? {
            return Err(AppError::not_found("Book"));
        }
        tracing::info!(book_id = id, user_id = user.id, "book deleted");
        Ok(())
    }

    async fn save(&self, user: &AuthUser, id: i64, book: NewBook) -> Result<Book> {
        let book = self
            .store
            .update_book(id, book)
            .await?
            .ok_or_else(|| AppError::not_found("Book"))?;
        tracing::info!(book_id = id, user_id = user.id, "book updated");
        Ok(book)
    }

    async fn validated(&self, input: BookInput) -> Result<NewBook> {
        check_book(&input, current_year())?;
        if self.store.find_author(input.author).await?.is_none() {
            return Err(AppError::field(
                "author",
                format!("Invalid pk \"{}\" - object does not exist.", input.author),
            ));
        }
        Ok(NewBook {
            title: input.title.trim().to_string(),
            publication_year: input.publication_year,
            author_id: input.author,
        })
    }

    /// Every author with their books nested
    pub async fn list_authors(&self) -> Result<Vec<AuthorView>> {
        let authors = self.store.list_authors().await?;
        let mut by_author: BTreeMap<i64, Vec<Book>> = BTreeMap::new();
        for book in self.store.list_books(&BookFilter::default()).await? {
            by_author.entry(book.author_id).or_default().push(book);
        }

        Ok(authors
            .into_iter()
            .map(|author| AuthorView {
                books: by_author.remove(&author.id).unwrap_or_default(),
                id: author.id,
                name: author.name,
            })
            .collect())
    }

    pub async fn get_author(&self, id: i64) -> Result<AuthorView> {
        let author = self
            .store
            .find_author(id)
            .await?
            .ok_or_else(|| AppError::not_found("Author"))?;
        let books = self
            .store
            .list_books(&BookFilter {
                author_id: Some(id),
                ..Default::default()
            })
            .await?;
        Ok(AuthorView {
            id: author.id,
            name: author.name,
            books,
        })
    }

    pub async fn create_author(&self, user: &AuthUser, input: NameInput) -> Result<AuthorView> {
        input.validate()?;
        let author = self.store.create_author(input.name.trim().to_string()).await?;
        tracing::info!(author_id = author.id, user_id = user.id, "author created");
        Ok(AuthorView {
            id: author.id,
            name: author.name,
            books: Vec::new(),
        })
    }

    pub async fn list_libraries(&self) -> Result<Vec<LibraryView>> {
        let mut views = Vec::new();
        for library in self.store.list_libraries().await? {
            views.push(self.library_view(library).await?);
        }
        Ok(views)
    }

    pub async fn get_library(&self, id: i64) -> Result<LibraryView> {
        let library = self.load_library(id).await?;
        self.library_view(library).await
    }

    pub async fn create_library(&self, user: &AuthUser, input: NameInput) -> Result<LibraryView> {
        input.validate()?;
        let library = self.store.create_library(input.name.trim().to_string()).await?;
        tracing::info!(library_id = library.id, user_id = user.id, "library created");
        self.library_view(library).await
    }

    /// Idempotent: adding a book the library already holds changes nothing
    pub async fn add_book(&self, user: &AuthUser, library_id: i64, book_id: i64) -> Result<LibraryView> {
        let library = self.load_library(library_id).await?;
        self.get_book(book_id).await?;
        if self.store.add_library_book(library_id, book_id).await? {
            tracing::info!(library_id, book_id, user_id = user.id, "book added to library");
        } else {
            tracing::debug!(library_id, book_id, "book already in library");
        }
        self.library_view(library).await
    }

    /// Idempotent: removing a book the library does not hold changes nothing
    pub async fn remove_book(&self, user: &AuthUser, library_id: i64, book_id: i64) -> Result<LibraryView> {
        let library = self.load_library(library_id).await?;
        if self.store.remove_library_book(library_id, book_id).await? {
            tracing::info!(library_id, book_id, user_id = user.id, "book removed from library");
        }
        self.library_view(library).await
    }

    pub async fn assign_librarian(&self, user: &AuthUser, library_id: i64, input: NameInput) -> Result<Librarian> {
        input.validate()?;
        self.load_library(library_id).await?;
        let librarian = self
            .store
            .set_librarian(library_id, input.name.trim().to_string())
            .await?;
        tracing::info!(library_id, librarian_id = librarian.id, user_id = user.id, "librarian assigned");
        Ok(librarian)
    }

    async fn load_library(&self, id: i64) -> Result<Library> {
        self.store
            .find_library(id)
            .await?
            .ok_or_else(|| AppError::not_found("Library"))
    }

    async fn library_view(&self, library: Library) -> Result<LibraryView> {
        let books = self.store.library_books(library.id).await?;
        let librarian = self.store.find_librarian(library.id).await?;
        Ok(LibraryView {
            id: library.id,
            name: library.name,
            books,
            librarian,
        })
    }
}
