use actix_middleware::Principal;
use agora_common::validation::{trimmed, trimmed_opt};
use agora_common::{FieldErrors, PageRequest, PagedResponse, SearchTerm};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

use super::decode_body;
use crate::domain::models::{NewPost, PostChanges, PostFilter, PostRecord};
use crate::domain::views::PostView;
use crate::error::{AppError, Result};
use crate::permissions::{self, Action};
use crate::repository::SocialStore;

const MAX_TAG_LEN: usize = 50;

/// Body for create and full update
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PostInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "agora_common::validation::non_blank"), length(max = 200))]
    pub title: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "agora_common::validation::non_blank"))]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Body for partial update
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PostPatch {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(custom(function = "agora_common::validation::non_blank"), length(max = 200))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(custom(function = "agora_common::validation::non_blank"))]
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl From<PostInput> for PostPatch {
    fn from(input: PostInput) -> Self {
        Self {
            title: Some(input.title),
            content: Some(input.content),
            tags: Some(input.tags),
        }
    }
}

/// Listing filters as received from the query string
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub search: Option<String>,
    pub tag: Option<String>,
    pub author: Option<i64>,
}

/// Trim, lower-case and de-duplicate, keeping first-seen order
pub fn normalize_tags(tags: Vec<String>) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() || out.contains(&tag) {
            continue;
        }
        if tag.chars().count() > MAX_TAG_LEN {
            return Err(AppError::Validation(FieldErrors::single(
                "tags",
                format!("Ensure each tag has no more than {MAX_TAG_LEN} characters."),
            )));
        }
        out.push(tag);
    }
    Ok(out)
}

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn SocialStore>,
}

impl PostService {
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self { store }
    }

    /// Newest first. `search` hits title, content or any tag.
    pub async fn list(&self, query: PostQuery, page: PageRequest) -> Result<PagedResponse<PostView>> {
        let filter = PostFilter {
            search: SearchTerm::parse(query.search.as_deref()),
            tag: query
                .tag
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty()),
            author_id: query.author,
            followed_by: None,
        };
        let (items, total) = self.store.list_posts(&filter, page).await?;
        Ok(PagedResponse::new(items, total, page).map(PostView::from))
    }

    pub async fn get(&self, id: i64) -> Result<PostView> {
        Ok(self.load(id).await?.into())
    }

    /// The author is always the caller.
    pub async fn create(&self, actor: &Principal, body: Value) -> Result<PostView> {
        let author = permissions::require_user(actor)?;
        let input: PostInput = decode_body(body)?;
        input.validate()?;

        let post = self
            .store
            .insert_post(NewPost {
                author_id: author.id,
                title: input.title,
                content: input.content,
                tags: normalize_tags(input.tags)?,
            })
            .await?;

        tracing::info!(post_id = post.id, author_id = author.id, "post created");
        Ok(post.into())
    }

    /// Full update: every editable field must be present.
    pub async fn replace(&self, actor: &Principal, id: i64, body: Value) -> Result<PostView> {
        let post = self.authorize_update(actor, id).await?;
        let input: PostInput = decode_body(body)?;
        self.apply(post, input.into()).await
    }

    pub async fn update(&self, actor: &Principal, id: i64, body: Value) -> Result<PostView> {
        let post = self.authorize_update(actor, id).await?;
        let patch: PostPatch = decode_body(body)?;
        self.apply(post, patch).await
    }

    async fn authorize_update(&self, actor: &Principal, id: i64) -> Result<PostRecord> {
        permissions::require(actor, Action::Update)?;
        let post = self.load(id).await?;
        permissions::check_object(actor, Action::Update, &post)?;
        Ok(post)
    }

    async fn apply(&self, post: PostRecord, patch: PostPatch) -> Result<PostView> {
        patch.validate()?;

        let changes = PostChanges {
            title: patch.title,
            content: patch.content,
            tags: patch.tags.map(normalize_tags).transpose()?,
        };
        let updated = self
            .store
            .update_post(post.id, changes)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))?;

        tracing::info!(post_id = updated.id, "post updated");
        Ok(updated.into())
    }

    pub async fn delete(&self, actor: &Principal, id: i64) -> Result<()> {
        permissions::require(actor, Action::Delete)?;
        let post = self.load(id).await?;
        permissions::check_object(actor, Action::Delete, &post)?;

        if !self.store.delete_post(post.id).await? {
            return Err(AppError::not_found("Post"));
        }
        tracing::info!(post_id = post.id, "post deleted");
        Ok(())
    }

    async fn load(&self, id: i64) -> Result<PostRecord> {
        self.store
            .find_post(id)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::NewUser;
    use crate::repository::MemorySocialStore;
    use actix_middleware::AuthUser;
    use serde_json::json;

    async fn principal(store: &Arc<dyn SocialStore>, name: &str) -> Principal {
        let user = store
            .create_user(NewUser {
                username: name.into(),
                email: format!("{name}@example.com"),
                password_hash: "x".into(),
                bio: String::new(),
            })
            .await
            .unwrap();
        Principal::User(AuthUser {
            id: user.id,
            username: user.username,
        })
    }

    fn hello() -> Value {
        json!({
            "title": "Hello",
            "content": "First post",
            "tags": [" Rust ", "rust", "", "Web"],
        })
    }

    #[test]
    fn test_normalize_tags() {
        let tags = normalize_tags(vec![" Rust ".into(), "RUST".into(), " ".into(), "web".into()]).unwrap();
        assert_eq!(tags, vec!["rust", "web"]);
        assert!(normalize_tags(vec!["x".repeat(51)]).is_err());
    }

    #[tokio::test]
    async fn test_owner_update_and_foreign_update() {
        let store: Arc<dyn SocialStore> = Arc::new(MemorySocialStore::new());
        let a = principal(&store, "a").await;
        let b = principal(&store, "b").await;
        let service = PostService::new(store);

        let post = service.create(&a, hello()).await.unwrap();
        assert_eq!(post.tags, vec!["rust", "web"]);

        let patch = json!({ "title": "Hello v2" });
        assert!(matches!(
            service.update(&b, post.id, patch.clone()).await,
            Err(AppError::Forbidden(_))
        ));

        let updated = service.update(&a, post.id, patch).await.unwrap();
        assert_eq!(updated.title, "Hello v2");
        assert_eq!(updated.author.id, a.id().unwrap());
        assert_eq!(updated.content, "First post");
    }

    #[tokio::test]
    async fn test_anonymous_create_stores_nothing() {
        let store: Arc<dyn SocialStore> = Arc::new(MemorySocialStore::new());
        let service = PostService::new(store);

        let err = tokio_test::assert_err!(service.create(&Principal::Anonymous, hello()).await);
        assert!(matches!(err, AppError::Unauthenticated));

        let page = service.list(PostQuery::default(), PageRequest::new(1, 10)).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_error_precedence() {
        let store: Arc<dyn SocialStore> = Arc::new(MemorySocialStore::new());
        let a = principal(&store, "a").await;
        let b = principal(&store, "b").await;
        let service = PostService::new(store);
        let post = service.create(&a, hello()).await.unwrap();

        // anonymous: 401 even for a missing post
        assert!(matches!(
            service.delete(&Principal::Anonymous, 999).await,
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(service.delete(&b, 999).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.delete(&b, post.id).await, Err(AppError::Forbidden(_))));
        assert!(service.delete(&a, post.id).await.is_ok());
        assert!(matches!(service.get(post.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_search_and_tag_filters() {
        let store: Arc<dyn SocialStore> = Arc::new(MemorySocialStore::new());
        let a = principal(&store, "a").await;
        let service = PostService::new(store);
        service.create(&a, hello()).await.unwrap();
        service
            .create(&a, json!({ "title": "Cooking", "content": "pasta", "tags": ["food"] }))
            .await
            .unwrap();

        let by_tag_text = PostQuery {
            search: Some("WEB".into()),
            ..Default::default()
        };
        let page = service.list(by_tag_text, PageRequest::new(1, 10)).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "Hello");

        let by_tag = PostQuery {
            tag: Some("Food".into()),
            ..Default::default()
        };
        let page = service.list(by_tag, PageRequest::new(1, 10)).await.unwrap();
        assert_eq!(page.items[0].title, "Cooking");
    }

    #[tokio::test]
    async fn test_guards_run_before_body_is_read() {
        let store: Arc<dyn SocialStore> = Arc::new(MemorySocialStore::new());
        let a = principal(&store, "a").await;
        let b = principal(&store, "b").await;
        let service = PostService::new(store);
        let post = service.create(&a, hello()).await.unwrap();

        let bad = json!({ "title": 123 });
        assert!(matches!(
            service.create(&Principal::Anonymous, bad.clone()).await,
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(
            service.update(&b, post.id, bad.clone()).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.replace(&b, post.id, bad.clone()).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.update(&b, 999, bad.clone()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.update(&a, post.id, bad).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected() {
        let store: Arc<dyn SocialStore> = Arc::new(MemorySocialStore::new());
        let a = principal(&store, "a").await;
        let service = PostService::new(store);

        let err = tokio_test::assert_err!(
            service.create(&a, json!({ "title": "   ", "content": " \n " })).await
        );
        let AppError::Validation(errors) = err else {
            panic!("expected field errors, got {err:?}");
        };
        assert!(errors.get("title").is_some());
        assert!(errors.get("content").is_some());

        let post = service
            .create(&a, json!({ "title": "  Padded  ", "content": "body" }))
            .await
            .unwrap();
        assert_eq!(post.title, "Padded");

        let err = tokio_test::assert_err!(service.update(&a, post.id, json!({ "title": "\t" })).await);
        assert!(matches!(err, AppError::Validation(ref e) if e.get("title").is_some()));
        assert_eq!(service.get(post.id).await.unwrap().title, "Padded");
    }
}
