//! Engagement ledger: likes and the notifications they emit.
use actix_middleware::Principal;
use std::sync::Arc;

use crate::domain::models::{Like, NewNotification, NotificationTarget, PostRecord};
use crate::error::{AppError, Result};
use crate::metrics::social::{LIKE_EVENTS_TOTAL, NOTIFICATIONS_CREATED_TOTAL};
use crate::permissions;
use crate::repository::SocialStore;

pub const LIKED_VERB: &str = "liked your post";

#[derive(Debug, Clone)]
pub enum LikeOutcome {
    Created(Like),
    AlreadyLiked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlikeOutcome {
    Removed,
    NotLiked,
}

#[derive(Clone)]
pub struct EngagementLedger {
    store: Arc<dyn SocialStore>,
}

impl EngagementLedger {
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self { store }
    }

    /// Record a like. Only a newly created like on someone else's post
    /// notifies the author.
    pub async fn like(&self, actor: &Principal, post_id: i64) -> Result<LikeOutcome> {
        let user = permissions::require_user(actor)?;
        let post = self.post(post_id).await?;

        let notification = (post.author_id != user.id).then(|| NewNotification {
            recipient_id: post.author_id,
            actor_id: user.id,
            verb: LIKED_VERB.to_string(),
            target: Some(NotificationTarget::Post(post.id)),
        });
        let Some((like, notified)) = self
            .store
            .insert_like_notifying(user.id, post.id, notification)
            .await?
        else {
            LIKE_EVENTS_TOTAL.with_label_values(&["already_liked"]).inc();
            tracing::debug!(user_id = user.id, post_id = post.id, "duplicate like");
            return Ok(LikeOutcome::AlreadyLiked);
        };
        LIKE_EVENTS_TOTAL.with_label_values(&["created"]).inc();
        if notified.is_some() {
            NOTIFICATIONS_CREATED_TOTAL.with_label_values(&["post"]).inc();
        }

        tracing::info!(user_id = user.id, post_id = post.id, "post liked");
        Ok(LikeOutcome::Created(like))
    }

    /// Remove a like. Notifications already sent are kept.
    pub async fn unlike(&self, actor: &Principal, post_id: i64) -> Result<UnlikeOutcome> {
        let user = permissions::require_user(actor)?;
        let post = self.post(post_id).await?;

        if self.store.delete_like(user.id, post.id).await? {
            LIKE_EVENTS_TOTAL.with_label_values(&["removed"]).inc();
            tracing::info!(user_id = user.id, post_id = post.id, "post unliked");
            Ok(UnlikeOutcome::Removed)
        } else {
            LIKE_EVENTS_TOTAL.with_label_values(&["not_liked"]).inc();
            Ok(UnlikeOutcome::NotLiked)
        }
    }

    async fn post(&self, post_id: i64) -> Result<PostRecord> {
        self.store
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{NewPost, NewUser};
    use crate::repository::MemorySocialStore;
    use actix_middleware::AuthUser;
    use agora_common::PageRequest;

    struct Fixture {
        store: Arc<dyn SocialStore>,
        ledger: EngagementLedger,
        author: Principal,
        fan: Principal,
        post_id: i64,
    }

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

    async fn fixture() -> Fixture {
        let store: Arc<dyn SocialStore> = Arc::new(MemorySocialStore::new());
        let author = principal(&store, "author").await;
        let fan = principal(&store, "fan").await;
        let post = store
            .insert_post(NewPost {
                author_id: author.id().unwrap(),
                title: "Hello".into(),
                content: "world".into(),
                tags: vec![],
            })
            .await
            .unwrap();
        Fixture {
            ledger: EngagementLedger::new(store.clone()),
            store,
            author,
            fan,
            post_id: post.id,
        }
    }

    async fn notifications_for(store: &Arc<dyn SocialStore>, who: &Principal) -> i64 {
        store
            .list_notifications(who.id().unwrap(), false, PageRequest::new(1, 100))
            .await
            .unwrap()
            .1
    }

    #[tokio::test]
    async fn test_double_like_stores_one() {
        let f = fixture().await;
        assert!(matches!(f.ledger.like(&f.fan, f.post_id).await.unwrap(), LikeOutcome::Created(_)));
        assert!(matches!(
            f.ledger.like(&f.fan, f.post_id).await.unwrap(),
            LikeOutcome::AlreadyLiked
        ));
        assert_eq!(f.store.count_likes(f.post_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_like_then_unlike() {
        let f = fixture().await;
        f.ledger.like(&f.fan, f.post_id).await.unwrap();
        assert_eq!(f.ledger.unlike(&f.fan, f.post_id).await.unwrap(), UnlikeOutcome::Removed);
        assert_eq!(f.store.count_likes(f.post_id).await.unwrap(), 0);
        assert_eq!(f.ledger.unlike(&f.fan, f.post_id).await.unwrap(), UnlikeOutcome::NotLiked);
    }

    #[tokio::test]
    async fn test_self_like_does_not_notify() {
        let f = fixture().await;
        f.ledger.like(&f.author, f.post_id).await.unwrap();
        assert_eq!(f.store.count_likes(f.post_id).await.unwrap(), 1);
        assert_eq!(notifications_for(&f.store, &f.author).await, 0);
    }

    #[tokio::test]
    async fn test_like_notifies_author_once() {
        let f = fixture().await;
        f.ledger.like(&f.fan, f.post_id).await.unwrap();
        f.ledger.like(&f.fan, f.post_id).await.unwrap();
        f.ledger.unlike(&f.fan, f.post_id).await.unwrap();

        let (items, total) = f
            .store
            .list_notifications(f.author.id().unwrap(), false, PageRequest::new(1, 10))
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].verb, LIKED_VERB);
        assert_eq!(items[0].target(), Some(NotificationTarget::Post(f.post_id)));
        assert_eq!(notifications_for(&f.store, &f.fan).await, 0);
    }

    #[tokio::test]
    async fn test_like_missing_post() {
        let f = fixture().await;
        assert!(matches!(f.ledger.like(&f.fan, 424242).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_anonymous_like_rejected() {
        let f = fixture().await;
        assert!(matches!(
            f.ledger.like(&Principal::Anonymous, f.post_id).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_failed_notification_keeps_like_unrecorded() {
        let f = fixture().await;
        // author account no longer exists, so the notification cannot be stored
        let orphan = f
            .store
            .insert_post(NewPost {
                author_id: 31_337,
                title: "Orphaned".into(),
                content: "no author".into(),
                tags: vec![],
            })
            .await
            .unwrap();

        tokio_test::assert_err!(f.ledger.like(&f.fan, orphan.id).await);
        assert_eq!(f.store.count_likes(orphan.id).await.unwrap(), 0);

        // a retry is not mistaken for a duplicate
        let retry = tokio_test::assert_err!(f.ledger.like(&f.fan, orphan.id).await);
        assert!(matches!(retry, AppError::Internal(_)));
    }
}
