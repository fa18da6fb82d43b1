//! Social graph: directed follow edges between users.
use actix_middleware::Principal;
use agora_common::{PageRequest, PagedResponse};
use serde::Serialize;
use std::sync::Arc;

use crate::domain::models::{FollowCounts, User, UserRef};
use crate::error::{AppError, Result};
use crate::metrics::social::FOLLOW_EVENTS_TOTAL;
use crate::permissions;
use crate::repository::SocialStore;

/// Target state after a follow or unfollow, so callers need not re-query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowSnapshot {
    pub user_id: i64,
    pub username: String,
    pub followers_count: i64,
    pub following_count: i64,
    pub following: bool,
}

#[derive(Clone)]
pub struct SocialGraph {
    store: Arc<dyn SocialStore>,
}

impl SocialGraph {
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self { store }
    }

    /// Idempotent: following twice leaves a single edge.
    pub async fn follow(&self, actor: &Principal, target_id: i64) -> Result<FollowSnapshot> {
        let user = permissions::require_user(actor)?;
        let target = self.target(target_id).await?;
        if user.id == target.id {
            return Err(AppError::SelfReference("You cannot follow yourself.".to_string()));
        }

        let created = self.store.add_follow(user.id, target.id).await?;
        if created {
            FOLLOW_EVENTS_TOTAL.with_label_values(&["follow"]).inc();
            tracing::info!(follower_id = user.id, followee_id = target.id, "follow created");
        } else {
            tracing::debug!(follower_id = user.id, followee_id = target.id, "already following");
        }

        self.snapshot(&target, true).await
    }

    /// Removing an absent edge is a successful no-op.
    pub async fn unfollow(&self, actor: &Principal, target_id: i64) -> Result<FollowSnapshot> {
        let user = permissions::require_user(actor)?;
        let target = self.target(target_id).await?;
        if user.id == target.id {
            return Err(AppError::SelfReference("You cannot unfollow yourself.".to_string()));
        }

        let removed = self.store.remove_follow(user.id, target.id).await?;
        if removed {
            FOLLOW_EVENTS_TOTAL.with_label_values(&["unfollow"]).inc();
            tracing::info!(follower_id = user.id, followee_id = target.id, "follow removed");
        } else {
            tracing::debug!(follower_id = user.id, followee_id = target.id, "was not following");
        }

        self.snapshot(&target, false).await
    }

    pub async fn followers_count(&self, user_id: i64) -> Result<i64> {
        Ok(self.store.follow_counts(user_id).await?.followers)
    }

    pub async fn following_count(&self, user_id: i64) -> Result<i64> {
        Ok(self.store.follow_counts(user_id).await?.following)
    }

    pub async fn counts(&self, user_id: i64) -> Result<FollowCounts> {
        self.store.follow_counts(user_id).await
    }

    pub async fn followers(&self, user_id: i64, page: PageRequest) -> Result<PagedResponse<UserRef>> {
        self.target(user_id).await?;
        let (items, total) = self.store.list_followers(user_id, page).await?;
        Ok(PagedResponse::new(items, total, page))
    }

    pub async fn following(&self, user_id: i64, page: PageRequest) -> Result<PagedResponse<UserRef>> {
        self.target(user_id).await?;
        let (items, total) = self.store.list_following(user_id, page).await?;
        Ok(PagedResponse::new(items, total, page))
    }

    async fn target(&self, user_id: i64) -> Result<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    async fn snapshot(&self, target: &User, following: bool) -> Result<FollowSnapshot> {
        let counts = self.store.follow_counts(target.id).await?;
        Ok(FollowSnapshot {
            user_id: target.id,
            username: target.username.clone(),
            followers_count: counts.followers,
            following_count: counts.following,
            following,
        })
    }
}
