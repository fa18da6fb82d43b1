use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, Postgres};
use sqlx::QueryBuilder;
use std::time::Duration;

use super::CatalogStore;
use crate::config::DatabaseConfig;
use crate::error::{AppError, Result};
use crate::models::{Author, Book, BookFilter, Librarian, Library, NewBook};

const BOOK_COLUMNS: &str = "b.id, b.title, b.publication_year, b.author_id";

#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig, url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")
    }
}

fn push_book_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &BookFilter) {
    if let Some(title) = &filter.title {
        qb.push(" AND b.title = ").push_bind(title.clone());
    }
    if let Some(author_id) = filter.author_id {
        qb.push(" AND b.author_id = ").push_bind(author_id);
    }
    if let Some(year) = filter.publication_year {
        qb.push(" AND b.publication_year = ").push_bind(year);
    }
    if let Some(term) = &filter.search {
        let pattern = term.like_pattern();
        qb.push(" AND (b.title ILIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR a.name ILIKE ")
            .push_bind(pattern)
            .push(r" ESCAPE '\')");
    }
}

/// Foreign key violations name the missing parent
fn map_missing_parent(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            return match db.constraint() {
                Some(c) if c.ends_with("library_id_fkey") => AppError::not_found("Library"),
                Some(c) if c.ends_with("book_id_fkey") => AppError::not_found("Book"),
                _ => AppError::field("author", "Author does not exist."),
            };
        }
    }
    AppError::Database(err)
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_author(&self, name: String) -> Result<Author> {
        let author = sqlx::query_as::<_, Author>(
            "INSERT INTO authors (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(author)
    }

    async fn find_author(&self, id: i64) -> Result<Option<Author>> {
        let author = sqlx::query_as::<_, Author>("SELECT id, name FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(author)
    }

    async fn list_authors(&self) -> Result<Vec<Author>> {
        let authors = sqlx::query_as::<_, Author>("SELECT id, name FROM authors ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(authors)
    }

    async fn insert_book(&self, book: NewBook) -> Result<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, publication_year, author_id)
            VALUES ($1, $2, $3)
            RETURNING id, title, publication_year, author_id
            "#,
        )
        .bind(book.title)
        .bind(book.publication_year)
        .bind(book.author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_missing_parent)
    }

    async fn find_book(&self, id: i64) -> Result<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books b WHERE b.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(book)
    }

    async fn update_book(&self, id: i64, book: NewBook) -> Result<Option<Book>> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = $2, publication_year = $3, author_id = $4
            WHERE id = $1
            RETURNING id, title, publication_year, author_id
            "#,
        )
        .bind(id)
        .bind(book.title)
        .bind(book.publication_year)
        .bind(book.author_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_missing_parent)
    }

    async fn delete_book(&self, id: i64) -> Result<bool> {
        // library_books rows go with it through ON DELETE CASCADE
        let affected = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn list_books(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {BOOK_COLUMNS} FROM books b JOIN authors a ON a.id = b.author_id WHERE TRUE"
        ));
        push_book_filters(&mut qb, filter);
        qb.push(" ORDER BY ").push(filter.ordering.sql());

        let books = qb.build_query_as::<Book>().fetch_all(&self.pool).await?;
        Ok(books)
    }

    async fn create_library(&self, name: String) -> Result<Library> {
        let library = sqlx::query_as::<_, Library>(
            "INSERT INTO libraries (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(library)
    }

    async fn find_library(&self, id: i64) -> Result<Option<Library>> {
        let library = sqlx::query_as::<_, Library>("SELECT id, name FROM libraries WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(library)
    }

    async fn list_libraries(&self) -> Result<Vec<Library>> {
        let libraries = sqlx::query_as::<_, Library>("SELECT id, name FROM libraries ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(libraries)
    }

    async fn add_library_book(&self, library_id: i64, book_id: i64) -> Result<bool> {
        let affected = sqlx::query(
            r#"
            INSERT INTO library_books (library_id, book_id)
            VALUES ($1, $2)
            ON CONFLICT (library_id, book_id) DO NOTHING
            "#,
        )
        .bind(library_id)
        .bind(book_id)
        .execute(&self.pool)
        .await
        .map_err(map_missing_parent)?
        .rows_affected();
        Ok(affected > 0)
    }

    async fn remove_library_book(&self, library_id: i64, book_id: i64) -> Result<bool> {
        let affected =
            sqlx::query("DELETE FROM library_books WHERE library_id = $1 AND book_id = $2")
                .bind(library_id)
                .bind(book_id)
                .execute(&self.pool)
                .await?
                .rows_affected();
        Ok(affected > 0)
    }

    async fn library_books(&self, library_id: i64) -> Result<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books b \
             JOIN library_books lb ON lb.book_id = b.id \
             WHERE lb.library_id = $1 ORDER BY b.id"
        ))
        .bind(library_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn find_librarian(&self, library_id: i64) -> Result<Option<Librarian>> {
        let librarian = sqlx::query_as::<_, Librarian>(
            "SELECT id, name, library_id FROM librarians WHERE library_id = $1",
        )
        .bind(library_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(librarian)
    }

    async fn set_librarian(&self, library_id: i64, name: String) -> Result<Librarian> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM librarians WHERE library_id = $1")
            .bind(library_id)
            .execute(&mut *tx)
            .await?;

        let librarian = sqlx::query_as::<_, Librarian>(
            r#"
            INSERT INTO librarians (name, library_id)
            VALUES ($1, $2)
            RETURNING id, name, library_id
            "#,
        )
        .bind(name)
        .bind(library_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_missing_parent)?;

        tx.commit().await?;
        Ok(librarian)
    }
}
