use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::permissions::Owned;

/// Registered account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub bio: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub bio: String,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub bio: Option<String>,
}

/// Compact `{id, username}` reference embedded in other resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRef {
    pub id: i64,
    pub username: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FollowCounts {
    pub followers: i64,
    pub following: i64,
}

/// Post row joined with its author and engagement counters
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRecord {
    pub id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub comments_count: i64,
    pub likes_count: i64,
}

impl Owned for PostRecord {
    fn owner_id(&self) -> i64 {
        self.author_id
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

/// Partial update; `None` leaves the column untouched. The author is never
/// part of a change set.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Post listing filters, combined with AND
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub search: Option<agora_common::SearchTerm>,
    /// Already normalized (trimmed, lower-case)
    pub tag: Option<String>,
    pub author_id: Option<i64>,
    /// Restrict to authors this user follows
    pub followed_by: Option<i64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRecord {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for CommentRecord {
    fn owner_id(&self) -> i64 {
        self.author_id
    }
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub author_id: i64,
    pub content: String,
}

/// Like entity - at most one per (user, post)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Like {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
    pub created_at: DateTime<Utc>,
}

/// What a notification points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationTarget {
    Post(i64),
    Comment(i64),
}

impl NotificationTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationTarget::Post(_) => "post",
            NotificationTarget::Comment(_) => "comment",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            NotificationTarget::Post(id) | NotificationTarget::Comment(id) => *id,
        }
    }

    /// Rebuild from stored columns. Unknown kinds yield `None`.
    pub fn from_parts(kind: Option<&str>, id: Option<i64>) -> Option<Self> {
        match (kind?, id?) {
            ("post", id) => Some(NotificationTarget::Post(id)),
            ("comment", id) => Some(NotificationTarget::Comment(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRecord {
    pub id: i64,
    pub recipient_id: i64,
    pub actor_id: i64,
    pub actor_username: String,
    pub verb: String,
    pub target_kind: Option<String>,
    pub target_id: Option<i64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn target(&self) -> Option<NotificationTarget> {
        NotificationTarget::from_parts(self.target_kind.as_deref(), self.target_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: i64,
    pub actor_id: i64,
    pub verb: String,
    pub target: Option<NotificationTarget>,
}
