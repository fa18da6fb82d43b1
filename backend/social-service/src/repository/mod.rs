//! Persistence seam for social-service.
//!
//! Every mutating method is atomic against the store, so uniqueness
//! invariants (one like per user and post, one edge per follower and
//! followee) hold under concurrent duplicate requests, and a like is never
//! stored without the notification it was meant to emit.

pub mod memory;
pub mod postgres;

use agora_common::PageRequest;
use async_trait::async_trait;

use crate::domain::models::{
    CommentRecord, FollowCounts, Like, NewComment, NewNotification, NewPost, NewUser,
    NotificationRecord, PostChanges, PostFilter, PostRecord, User, UserChanges, UserRef,
};
use crate::error::Result;

pub use memory::MemorySocialStore;
pub use postgres::PgSocialStore;

#[async_trait]
pub trait SocialStore: Send + Sync {
    /// Cheap liveness check used by `/ready`
    async fn ping(&self) -> Result<()>;

    // ---- users -----------------------------------------------------------

    /// Fails with a validation error when username or email is taken
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn find_user(&self, id: i64) -> Result<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<Option<User>>;

    // ---- follow edges ----------------------------------------------------

    /// Returns true if a new edge was inserted
    async fn add_follow(&self, follower_id: i64, followee_id: i64) -> Result<bool>;
    /// Returns true if an edge was removed
    async fn remove_follow(&self, follower_id: i64, followee_id: i64) -> Result<bool>;
    async fn is_following(&self, follower_id: i64, followee_id: i64) -> Result<bool>;
    async fn follow_counts(&self, user_id: i64) -> Result<FollowCounts>;
    /// Newest edge first
    async fn list_followers(&self, user_id: i64, page: PageRequest) -> Result<(Vec<UserRef>, i64)>;
    /// Newest edge first
    async fn list_following(&self, user_id: i64, page: PageRequest) -> Result<(Vec<UserRef>, i64)>;

    // ---- posts -----------------------------------------------------------

    async fn insert_post(&self, post: NewPost) -> Result<PostRecord>;
    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>>;
    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<Option<PostRecord>>;
    /// Cascades to the post's comments and likes
    async fn delete_post(&self, id: i64) -> Result<bool>;
    /// Newest first, ties broken by id descending
    async fn list_posts(&self, filter: &PostFilter, page: PageRequest) -> Result<(Vec<PostRecord>, i64)>;

    // ---- comments --------------------------------------------------------

    async fn insert_comment(&self, comment: NewComment) -> Result<CommentRecord>;
    async fn find_comment(&self, id: i64) -> Result<Option<CommentRecord>>;
    async fn update_comment(&self, id: i64, content: String) -> Result<Option<CommentRecord>>;
    async fn delete_comment(&self, id: i64) -> Result<bool>;
    /// Oldest first
    async fn list_comments(&self, post_id: Option<i64>, page: PageRequest) -> Result<(Vec<CommentRecord>, i64)>;

    // ---- likes -----------------------------------------------------------

    /// Get-or-create, storing `notification` in the same transaction when a
    /// like is created. `None` when the pair already existed; nothing is
    /// written if the notification insert fails.
    async fn insert_like_notifying(
        &self,
        user_id: i64,
        post_id: i64,
        notification: Option<NewNotification>,
    ) -> Result<Option<(Like, Option<NotificationRecord>)>>;
    /// Returns true if a like was removed
    async fn delete_like(&self, user_id: i64, post_id: i64) -> Result<bool>;
    async fn count_likes(&self, post_id: i64) -> Result<i64>;

    // ---- notifications ---------------------------------------------------

    async fn insert_notification(&self, notification: NewNotification) -> Result<NotificationRecord>;
    /// Newest first, scoped to the recipient
    async fn list_notifications(
        &self,
        recipient_id: i64,
        unread_only: bool,
        page: PageRequest,
    ) -> Result<(Vec<NotificationRecord>, i64)>;
    /// Returns false when the notification does not belong to `recipient_id`
    async fn mark_notification_read(&self, recipient_id: i64, id: i64) -> Result<bool>;
    async fn mark_all_notifications_read(&self, recipient_id: i64) -> Result<u64>;
    async fn count_unread_notifications(&self, recipient_id: i64) -> Result<i64>;
}
