use agora_common::{PageQuery, PageRequest};
use crypto_core::JwtKeys;
use std::sync::Arc;

use crate::config::PaginationConfig;
use crate::error::Result;
use crate::repository::SocialStore;
use crate::services::{
    AccountService, CommentService, EngagementLedger, FeedService, NotificationService,
    PostService, SocialGraph,
};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SocialStore>,
    pub keys: Arc<JwtKeys>,
    pub pagination: PaginationConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn SocialStore>, keys: Arc<JwtKeys>, pagination: PaginationConfig) -> Self {
        Self {
            store,
            keys,
            pagination,
        }
    }

    pub fn page(&self, page: Option<u32>, page_size: Option<u32>) -> Result<PageRequest> {
        Ok(PageQuery::new(page, page_size)
            .resolve(self.pagination.default_page_size, self.pagination.max_page_size)?)
    }

    pub fn accounts(&self) -> AccountService {
        AccountService::new(self.store.clone(), self.keys.clone())
    }

    pub fn graph(&self) -> SocialGraph {
        SocialGraph::new(self.store.clone())
    }

    pub fn posts(&self) -> PostService {
        PostService::new(self.store.clone())
    }

    pub fn comments(&self) -> CommentService {
        CommentService::new(self.store.clone())
    }

    pub fn engagement(&self) -> EngagementLedger {
        EngagementLedger::new(self.store.clone())
    }

    pub fn notifications(&self) -> NotificationService {
        NotificationService::new(self.store.clone())
    }

    pub fn feed(&self) -> FeedService {
        FeedService::new(self.store.clone())
    }
}
