//! Response representations
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::models::{CommentRecord, FollowCounts, PostRecord, User, UserRef};

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    /// Only present on the caller's own profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub bio: String,
    pub date_joined: DateTime<Utc>,
    pub followers_count: i64,
    pub following_count: i64,
}

impl UserView {
    pub fn private(user: &User, counts: FollowCounts) -> Self {
        Self {
            email: Some(user.email.clone()),
            ..Self::public(user, counts)
        }
    }

    pub fn public(user: &User, counts: FollowCounts) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: None,
            bio: user.bio.clone(),
            date_joined: user.created_at,
            followers_count: counts.followers,
            following_count: counts.following,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: i64,
    pub author: UserRef,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub comments_count: i64,
    pub likes_count: i64,
}

impl From<PostRecord> for PostView {
    fn from(post: PostRecord) -> Self {
        Self {
            id: post.id,
            author: UserRef {
                id: post.author_id,
                username: post.author_username,
            },
            title: post.title,
            content: post.content,
            tags: post.tags,
            created_at: post.created_at,
            updated_at: post.updated_at,
            comments_count: post.comments_count,
            likes_count: post.likes_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub post: i64,
    pub author: UserRef,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CommentRecord> for CommentView {
    fn from(comment: CommentRecord) -> Self {
        Self {
            id: comment.id,
            post: comment.post_id,
            author: UserRef {
                id: comment.author_id,
                username: comment.author_username,
            },
            content: comment.content,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetView {
    pub kind: &'static str,
    pub id: i64,
    /// `None` once the target has been deleted
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
    pub id: i64,
    pub actor: UserRef,
    pub verb: String,
    pub target: Option<TargetView>,
    pub is_read: bool,
    pub timestamp: DateTime<Utc>,
}
