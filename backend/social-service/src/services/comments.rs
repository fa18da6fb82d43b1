use actix_middleware::Principal;
use agora_common::validation::{trimmed, trimmed_opt};
use agora_common::{PageRequest, PagedResponse};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

use super::decode_body;
use crate::domain::models::{CommentRecord, NewComment};
use crate::domain::views::CommentView;
use crate::error::{AppError, Result};
use crate::permissions::{self, Action};
use crate::repository::SocialStore;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CommentInput {
    pub post: i64,
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "agora_common::validation::non_blank"), length(max = 5000))]
    pub content: String,
}

/// Comments never move between posts; only the text is editable.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CommentPatch {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(custom(function = "agora_common::validation::non_blank"), length(max = 5000))]
    pub content: Option<String>,
}

/// Full update body; `post` is ignored if sent
#[derive(Debug, Clone, Deserialize)]
pub struct CommentReplace {
    #[serde(deserialize_with = "trimmed")]
    pub content: String,
}

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn SocialStore>,
}

impl CommentService {
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self { store }
    }

    /// Oldest first, optionally scoped to one post
    pub async fn list(&self, post_id: Option<i64>, page: PageRequest) -> Result<PagedResponse<CommentView>> {
        let (items, total) = self.store.list_comments(post_id, page).await?;
        Ok(PagedResponse::new(items, total, page).map(CommentView::from))
    }

    pub async fn get(&self, id: i64) -> Result<CommentView> {
        Ok(self.load(id).await?.into())
    }

    pub async fn create(&self, actor: &Principal, body: Value) -> Result<CommentView> {
        let author = permissions::require_user(actor)?;
        let input: CommentInput = decode_body(body)?;
        input.validate()?;

        if self.store.find_post(input.post).await?.is_none() {
            return Err(AppError::field(
                "post",
                format!("Invalid pk \"{}\" - object does not exist.", input.post),
            ));
        }

        let comment = self
            .store
            .insert_comment(NewComment {
                post_id: input.post,
                author_id: author.id,
                content: input.content,
            })
            .await?;

        tracing::info!(comment_id = comment.id, post_id = comment.post_id, "comment created");
        Ok(comment.into())
    }

    pub async fn replace(&self, actor: &Principal, id: i64, body: Value) -> Result<CommentView> {
        let comment = self.authorize_update(actor, id).await?;
        let CommentReplace { content } = decode_body(body)?;
        self.apply(comment, CommentPatch { content: Some(content) }).await
    }

    pub async fn update(&self, actor: &Principal, id: i64, body: Value) -> Result<CommentView> {
        let comment = self.authorize_update(actor, id).await?;
        let patch: CommentPatch = decode_body(body)?;
        self.apply(comment, patch).await
    }

    async fn authorize_update(&self, actor: &Principal, id: i64) -> Result<CommentRecord> {
        permissions::require(actor, Action::Update)?;
        let comment = self.load(id).await?;
        permissions::check_object(actor, Action::Update, &comment)?;
        Ok(comment)
    }

    async fn apply(&self, comment: CommentRecord, patch: CommentPatch) -> Result<CommentView> {
        patch.validate()?;

        let Some(content) = patch.content else {
            return Ok(comment.into());
        };
        let updated = self
            .store
            .update_comment(comment.id, content)
            .await?
            .ok_or_else(|| AppError::not_found("Comment"))?;
        Ok(updated.into())
    }

    pub async fn delete(&self, actor: &Principal, id: i64) -> Result<()> {
        permissions::require(actor, Action::Delete)?;
        let comment = self.load(id).await?;
        permissions::check_object(actor, Action::Delete, &comment)?;

        if !self.store.delete_comment(comment.id).await? {
            return Err(AppError::not_found("Comment"));
        }
        tracing::info!(comment_id = comment.id, "comment deleted");
        Ok(())
    }

    async fn load(&self, id: i64) -> Result<CommentRecord> {
        self.store
            .find_comment(id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment"))
    }
}
