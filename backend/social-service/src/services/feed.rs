use actix_middleware::Principal;
use agora_common::{PageRequest, PagedResponse};
use std::sync::Arc;

use crate::domain::models::PostFilter;
use crate::domain::views::PostView;
use crate::error::Result;
use crate::permissions;
use crate::repository::SocialStore;

/// Posts by everyone the caller follows, newest first. Read-only.
#[derive(Clone)]
pub struct FeedService {
    store: Arc<dyn SocialStore>,
}

impl FeedService {
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self { store }
    }

    pub async fn feed(&self, actor: &Principal, page: PageRequest) -> Result<PagedResponse<PostView>> {
        let user = permissions::require_user(actor)?;
        let filter = PostFilter {
            followed_by: Some(user.id),
            ..Default::default()
        };
        let (items, total) = self.store.list_posts(&filter, page).await?;
        tracing::debug!(user_id = user.id, total, "feed assembled");
        Ok(PagedResponse::new(items, total, page).map(PostView::from))
    }
}
