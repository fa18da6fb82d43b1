use agora_common::SearchTerm;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Author {
    pub id: i64,
    pub name: String,
}

/// `author` is serialized as the author's id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub publication_year: i32,
    #[serde(rename = "author")]
    pub author_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub publication_year: i32,
    pub author_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Library {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Librarian {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing)]
    pub library_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorView {
    pub id: i64,
    pub name: String,
    pub books: Vec<Book>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryView {
    pub id: i64,
    pub name: String,
    pub books: Vec<Book>,
    pub librarian: Option<Librarian>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Id,
    Title,
    PublicationYear,
}

impl SortKey {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(SortKey::Id),
            "title" => Some(SortKey::Title),
            "publication_year" => Some(SortKey::PublicationYear),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortKey::Id => "b.id",
            SortKey::Title => "b.title",
            SortKey::PublicationYear => "b.publication_year",
        }
    }

    fn compare(&self, a: &Book, b: &Book) -> Ordering {
        match self {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Title => a.title.cmp(&b.title),
            SortKey::PublicationYear => a.publication_year.cmp(&b.publication_year),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortField {
    pub key: SortKey,
    pub descending: bool,
}

/// Parsed `?ordering=` value: comma separated fields, `-` prefix for
/// descending. Unknown fields are dropped and `id` always breaks ties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookOrdering(Vec<SortField>);

impl BookOrdering {
    pub fn parse(raw: Option<&str>) -> Self {
        let mut fields: Vec<SortField> = Vec::new();
        for part in raw.unwrap_or_default().split(',') {
            let part = part.trim();
            let (descending, name) = match part.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, part),
            };
            let Some(key) = SortKey::parse(name) else {
                continue;
            };
            if fields.iter().all(|f| f.key != key) {
                fields.push(SortField { key, descending });
            }
        }
        Self(fields)
    }

    pub fn fields(&self) -> &[SortField] {
        &self.0
    }

    pub fn compare(&self, a: &Book, b: &Book) -> Ordering {
        self.0
            .iter()
            .map(|f| {
                let ord = f.key.compare(a, b);
                if f.descending {
                    ord.reverse()
                } else {
                    ord
                }
            })
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| a.id.cmp(&b.id))
    }

    /// `ORDER BY` body built only from whitelisted columns
    pub fn sql(&self) -> String {
        let mut parts: Vec<String> = self
            .0
            .iter()
            .map(|f| format!("{} {}", f.key.column(), if f.descending { "DESC" } else { "ASC" }))
            .collect();
        if self.0.iter().all(|f| f.key != SortKey::Id) {
            parts.push("b.id ASC".to_string());
        }
        parts.join(", ")
    }
}

/// Book listing filters, combined with AND
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    /// Exact title match
    pub title: Option<String>,
    pub author_id: Option<i64>,
    pub publication_year: Option<i32>,
    /// Title or author name
    pub search: Option<SearchTerm>,
    pub ordering: BookOrdering,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: i64, title: &str, year: i32) -> Book {
        Book {
            id,
            title: title.into(),
            publication_year: year,
            author_id: 1,
        }
    }

    #[test]
    fn unknown_ordering_fields_are_ignored() {
        assert_eq!(BookOrdering::parse(Some("rating,-nope")), BookOrdering::default());
        assert_eq!(BookOrdering::parse(None).sql(), "b.id ASC");
    }

    #[test]
    fn ordering_sql_uses_whitelisted_columns() {
        let ordering = BookOrdering::parse(Some("-publication_year,title,'; DROP"));
        assert_eq!(ordering.sql(), "b.publication_year DESC, b.title ASC, b.id ASC");
        assert_eq!(BookOrdering::parse(Some("-id")).sql(), "b.id DESC");
    }

    #[test]
    fn compare_falls_back_to_id() {
        let ordering = BookOrdering::parse(Some("-publication_year"));
        let mut books = vec![book(1, "B", 1990), book(2, "A", 2001), book(3, "C", 1990)];
        books.sort_by(|a, b| ordering.compare(a, b));
        let ids: Vec<i64> = books.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn book_serializes_author_as_id() {
        let json = serde_json::to_value(book(4, "Dune", 1965)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "id": 4, "title": "Dune", "publication_year": 1965, "author": 1 })
        );
    }
}
