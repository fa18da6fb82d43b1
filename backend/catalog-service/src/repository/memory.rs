//! In-memory catalog for tests and database-less development runs.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

use super::CatalogStore;
use crate::error::{AppError, Result};
use crate::models::{Author, Book, BookFilter, Librarian, Library, NewBook};

#[derive(Default)]
struct State {
    seq: i64,
    authors: BTreeMap<i64, Author>,
    books: BTreeMap<i64, Book>,
    libraries: BTreeMap<i64, Library>,
    /// (library_id, book_id)
    memberships: BTreeSet<(i64, i64)>,
    /// keyed by library_id
    librarians: BTreeMap<i64, Librarian>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }

    fn author_name(&self, id: i64) -> &str {
        self.authors.get(&id).map(|a| a.name.as_str()).unwrap_or_default()
    }

    fn matches(&self, book: &Book, filter: &BookFilter) -> bool {
        filter.title.as_ref().map_or(true, |t| &book.title == t)
            && filter.author_id.map_or(true, |a| book.author_id == a)
            && filter.publication_year.map_or(true, |y| book.publication_year == y)
            && filter.search.as_ref().map_or(true, |term| {
                term.matches_any([book.title.as_str(), self.author_name(book.author_id)])
            })
    }

    fn require_author(&self, id: i64) -> Result<()> {
        if self.authors.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::field(
                "author",
                format!("Invalid pk \"{id}\" - object does not exist."),
            ))
        }
    }
}

#[derive(Default)]
pub struct MemoryCatalogStore {
    state: RwLock<State>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn create_author(&self, name: String) -> Result<Author> {
        let mut state = self.state.write().await;
        let author = Author {
            id: state.next_id(),
            name,
        };
        state.authors.insert(author.id, author.clone());
        Ok(author)
    }

    async fn find_author(&self, id: i64) -> Result<Option<Author>> {
        Ok(self.state.read().await.authors.get(&id).cloned())
    }

    async fn list_authors(&self) -> Result<Vec<Author>> {
        Ok(self.state.read().await.authors.values().cloned().collect())
    }

    async fn insert_book(&self, book: NewBook) -> Result<Book> {
        let mut state = self.state.write().await;
        state.require_author(book.author_id)?;
        let book = Book {
            id: state.next_id(),
            title: book.title,
            publication_year: book.publication_year,
            author_id: book.author_id,
        };
        state.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn find_book(&self, id: i64) -> Result<Option<Book>> {
        Ok(self.state.read().await.books.get(&id).cloned())
    }

    async fn update_book(&self, id: i64, book: NewBook) -> Result<Option<Book>> {
        let mut state = self.state.write().await;
        if !state.books.contains_key(&id) {
            return Ok(None);
        }
        state.require_author(book.author_id)?;
        let updated = Book {
            id,
            title: book.title,
            publication_year: book.publication_year,
            author_id: book.author_id,
        };
        state.books.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_book(&self, id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        let removed = state.books.remove(&id).is_some();
        if removed {
            state.memberships.retain(|&(_, book_id)| book_id != id);
        }
        Ok(removed)
    }

    async fn list_books(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        let state = self.state.read().await;
        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|b| state.matches(b, filter))
            .cloned()
            .collect();
        books.sort_by(|a, b| filter.ordering.compare(a, b));
        Ok(books)
    }

    async fn create_library(&self, name: String) -> Result<Library> {
        let mut state = self.state.write().await;
        let library = Library {
            id: state.next_id(),
            name,
        };
        state.libraries.insert(library.id, library.clone());
        Ok(library)
    }

    async fn find_library(&self, id: i64) -> Result<Option<Library>> {
        Ok(self.state.read().await.libraries.get(&id).cloned())
    }

    async fn list_libraries(&self) -> Result<Vec<Library>> {
        Ok(self.state.read().await.libraries.values().cloned().collect())
    }

    async fn add_library_book(&self, library_id: i64, book_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.libraries.contains_key(&library_id) {
            return Err(AppError::not_found("Library"));
        }
        if !state.books.contains_key(&book_id) {
            return Err(AppError::not_found("Book"));
        }
        Ok(state.memberships.insert((library_id, book_id)))
    }

    async fn remove_library_book(&self, library_id: i64, book_id: i64) -> Result<bool> {
        Ok(self
            .state
            .write()
            .await
            .memberships
            .remove(&(library_id, book_id)))
    }

    async fn library_books(&self, library_id: i64) -> Result<Vec<Book>> {
        let state = self.state.read().await;
        Ok(state
            .memberships
            .range((library_id, i64::MIN)..=(library_id, i64::MAX))
            .filter_map(|(_, book_id)| state.books.get(book_id).cloned())
            .collect())
    }

    async fn find_librarian(&self, library_id: i64) -> Result<Option<Librarian>> {
        Ok(self.state.read().await.librarians.get(&library_id).cloned())
    }

    async fn set_librarian(&self, library_id: i64, name: String) -> Result<Librarian> {
        let mut state = self.state.write().await;
        if !state.libraries.contains_key(&library_id) {
            return Err(AppError::not_found("Library"));
        }
        let librarian = Librarian {
            id: state.next_id(),
            name,
            library_id,
        };
        state.librarians.insert(library_id, librarian.clone());
        Ok(librarian)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookOrdering;
    use agora_common::SearchTerm;

    async fn seeded() -> (MemoryCatalogStore, Author, Author) {
        let store = MemoryCatalogStore::new();
        let herbert = store.create_author("Frank Herbert".into()).await.unwrap();
        let le_guin = store.create_author("Ursula K. Le Guin".into()).await.unwrap();
        for (title, year, author) in [
            ("Dune", 1965, herbert.id),
            ("Children of Dune", 1976, herbert.id),
            ("The Dispossessed", 1974, le_guin.id),
        ] {
            store
                .insert_book(NewBook {
                    title: title.into(),
                    publication_year: year,
                    author_id: author,
                })
                .await
                .unwrap();
        }
        (store, herbert, le_guin)
    }

    fn titles(books: &[Book]) -> Vec<&str> {
        books.iter().map(|b| b.title.as_str()).collect()
    }

    #[tokio::test]
    async fn filters_combine() {
        let (store, herbert, _) = seeded().await;

        let exact = BookFilter {
            title: Some("Dune".into()),
            ..Default::default()
        };
        assert_eq!(titles(&store.list_books(&exact).await.unwrap()), vec!["Dune"]);

        let by_author_and_year = BookFilter {
            author_id: Some(herbert.id),
            publication_year: Some(1976),
            ..Default::default()
        };
        assert_eq!(
            titles(&store.list_books(&by_author_and_year).await.unwrap()),
            vec!["Children of Dune"]
        );
    }

    #[tokio::test]
    async fn search_covers_author_name() {
        let (store, _, _) = seeded().await;
        let filter = BookFilter {
            search: SearchTerm::parse(Some("guin")),
            ..Default::default()
        };
        assert_eq!(titles(&store.list_books(&filter).await.unwrap()), vec!["The Dispossessed"]);
    }

    #[tokio::test]
    async fn ordering_applies() {
        let (store, _, _) = seeded().await;
        let filter = BookFilter {
            ordering: BookOrdering::parse(Some("-publication_year")),
            ..Default::default()
        };
        assert_eq!(
            titles(&store.list_books(&filter).await.unwrap()),
            vec!["Children of Dune", "The Dispossessed", "Dune"]
        );
    }

    #[tokio::test]
    async fn unknown_author_is_field_error() {
        let store = MemoryCatalogStore::new();
        let err = tokio_test::assert_err!(
            store
                .insert_book(NewBook {
                    title: "Orphan".into(),
                    publication_year: 2000,
                    author_id: 42,
                })
                .await
        );
        assert!(matches!(err, AppError::Validation(ref e) if e.get("author").is_some()));
    }

    #[tokio::test]
    async fn deleting_book_leaves_libraries() {
        let (store, _, _) = seeded().await;
        let library = store.create_library("Central".into()).await.unwrap();
        let books = store.list_books(&BookFilter::default()).await.unwrap();

        assert!(store.add_library_book(library.id, books[0].id).await.unwrap());
        assert!(!store.add_library_book(library.id, books[0].id).await.unwrap());
        assert!(store.add_library_book(library.id, books[1].id).await.unwrap());

        assert!(store.delete_book(books[0].id).await.unwrap());
        let held = store.library_books(library.id).await.unwrap();
        assert_eq!(held, vec![books[1].clone()]);
    }

    #[tokio::test]
    async fn librarian_is_replaced() {
        let store = MemoryCatalogStore::new();
        let library = store.create_library("Branch".into()).await.unwrap();

        store.set_librarian(library.id, "Ann".into()).await.unwrap();
        let second = store.set_librarian(library.id, "Ben".into()).await.unwrap();

        let current = store.find_librarian(library.id).await.unwrap().unwrap();
        assert_eq!(current, second);
        assert_eq!(current.name, "Ben");
    }
}
