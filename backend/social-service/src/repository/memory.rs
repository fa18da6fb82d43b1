//! In-process store used by tests and by development runs without a database.
//!
//! All state sits behind one `RwLock`; every trait method takes the lock once,
//! so check-and-insert sequences are atomic the same way the SQL statements are.

use agora_common::PageRequest;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

use super::SocialStore;
use crate::domain::models::{
    CommentRecord, FollowCounts, Like, NewComment, NewNotification, NewPost, NewUser,
    NotificationRecord, NotificationTarget, PostChanges, PostFilter, PostRecord, User, UserChanges,
    UserRef,
};
use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
struct PostRow {
    id: i64,
    author_id: i64,
    title: String,
    content: String,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CommentRow {
    id: i64,
    post_id: i64,
    author_id: i64,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct NotificationRow {
    id: i64,
    recipient_id: i64,
    actor_id: i64,
    verb: String,
    target: Option<NotificationTarget>,
    is_read: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct FollowEdge {
    follower_id: i64,
    followee_id: i64,
    seq: i64,
}

#[derive(Default)]
struct State {
    seq: i64,
    users: BTreeMap<i64, User>,
    follows: Vec<FollowEdge>,
    posts: BTreeMap<i64, PostRow>,
    comments: BTreeMap<i64, CommentRow>,
    likes: BTreeMap<(i64, i64), Like>,
    notifications: BTreeMap<i64, NotificationRow>,
}

impl State {
    /// Single sequence shared by all tables; ids only need to be unique and increasing
    fn next_id(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }

    fn username(&self, id: i64) -> String {
        self.users
            .get(&id)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }

    fn post_record(&self, row: &PostRow) -> PostRecord {
        PostRecord {
            id: row.id,
            author_id: row.author_id,
            author_username: self.username(row.author_id),
            title: row.title.clone(),
            content: row.content.clone(),
            tags: row.tags.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            comments_count: self.comments.values().filter(|c| c.post_id == row.id).count() as i64,
            likes_count: self.likes.keys().filter(|(_, post)| *post == row.id).count() as i64,
        }
    }

    fn comment_record(&self, row: &CommentRow) -> CommentRecord {
        CommentRecord {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            author_username: self.username(row.author_id),
            content: row.content.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    fn notification_record(&self, row: &NotificationRow) -> NotificationRecord {
        NotificationRecord {
            id: row.id,
            recipient_id: row.recipient_id,
            actor_id: row.actor_id,
            actor_username: self.username(row.actor_id),
            verb: row.verb.clone(),
            target_kind: row.target.map(|t| t.kind().to_string()),
            target_id: row.target.map(|t| t.id()),
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }

    /// Stand-in for the users foreign keys
    fn require_users(&self, ids: &[i64]) -> Result<()> {
        match ids.iter().copied().find(|id| !self.users.contains_key(id)) {
            Some(id) => Err(AppError::Internal(format!("user {id} does not exist"))),
            None => Ok(()),
        }
    }

    fn push_notification(&mut self, notification: NewNotification) -> NotificationRecord {
        let row = NotificationRow {
            id: self.next_id(),
            recipient_id: notification.recipient_id,
            actor_id: notification.actor_id,
            verb: notification.verb,
            target: notification.target,
            is_read: false,
            created_at: Utc::now(),
        };
        let record = self.notification_record(&row);
        self.notifications.insert(row.id, row);
        record
    }

    fn post_matches(&self, row: &PostRow, filter: &PostFilter, followed: &Option<HashSet<i64>>) -> bool {
        if let Some(term) = &filter.search {
            let hit = term.matches(&row.title)
                || term.matches(&row.content)
                || term.matches_any(row.tags.iter().map(String::as_str));
            if !hit {
                return false;
            }
        }
        if let Some(tag) = &filter.tag {
            if !row.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(author_id) = filter.author_id {
            if row.author_id != author_id {
                return false;
            }
        }
        if let Some(followed) = followed {
            if !followed.contains(&row.author_id) {
                return false;
            }
        }
        true
    }

    /// `matches` yields the user on the other end of each relevant edge
    fn edge_page(
        &self,
        matches: impl Fn(&FollowEdge) -> Option<i64>,
        page: PageRequest,
    ) -> (Vec<UserRef>, i64) {
        let mut edges: Vec<(i64, i64)> = self
            .follows
            .iter()
            .filter_map(|e| matches(e).map(|other| (e.seq, other)))
            .collect();
        edges.sort_by(|a, b| b.0.cmp(&a.0));

        let refs: Vec<UserRef> = edges
            .into_iter()
            .map(|(_, id)| UserRef {
                id,
                username: self.username(id),
            })
            .collect();
        let total = refs.len() as i64;
        (page.slice(&refs), total)
    }

    fn ensure_unique_user(&self, username: Option<&str>, email: Option<&str>, except: Option<i64>) -> Result<()> {
        let others = self.users.values().filter(|u| Some(u.id) != except);
        for user in others {
            if username == Some(user.username.as_str()) {
                return Err(AppError::field("username", "A user with that username already exists."));
            }
            if email.is_some_and(|e| e.eq_ignore_ascii_case(&user.email)) {
                return Err(AppError::field("email", "A user with that email already exists."));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySocialStore {
    state: RwLock<State>,
}

impl MemorySocialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SocialStore for MemorySocialStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        state.ensure_unique_user(Some(&user.username), Some(&user.email), None)?;

        let id = state.next_id();
        let created = User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            bio: user.bio,
            created_at: Utc::now(),
        };
        state.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<Option<User>> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&id) {
            return Ok(None);
        }
        state.ensure_unique_user(None, changes.email.as_deref(), Some(id))?;

        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(bio) = changes.bio {
            user.bio = bio;
        }
        Ok(Some(user.clone()))
    }

    async fn add_follow(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        let exists = state
            .follows
            .iter()
            .any(|e| e.follower_id == follower_id && e.followee_id == followee_id);
        if exists {
            return Ok(false);
        }
        let seq = state.next_id();
        state.follows.push(FollowEdge {
            follower_id,
            followee_id,
            seq,
        });
        Ok(true)
    }

    async fn remove_follow(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.follows.len();
        state
            .follows
            .retain(|e| !(e.follower_id == follower_id && e.followee_id == followee_id));
        Ok(state.follows.len() < before)
    }

    async fn is_following(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .follows
            .iter()
            .any(|e| e.follower_id == follower_id && e.followee_id == followee_id))
    }

    async fn follow_counts(&self, user_id: i64) -> Result<FollowCounts> {
        let state = self.state.read().await;
        Ok(FollowCounts {
            followers: state.follows.iter().filter(|e| e.followee_id == user_id).count() as i64,
            following: state.follows.iter().filter(|e| e.follower_id == user_id).count() as i64,
        })
    }

    async fn list_followers(&self, user_id: i64, page: PageRequest) -> Result<(Vec<UserRef>, i64)> {
        let state = self.state.read().await;
        Ok(state.edge_page(
            |e| (e.followee_id == user_id).then_some(e.follower_id),
            page,
        ))
    }

    async fn list_following(&self, user_id: i64, page: PageRequest) -> Result<(Vec<UserRef>, i64)> {
        let state = self.state.read().await;
        Ok(state.edge_page(
            |e| (e.follower_id == user_id).then_some(e.followee_id),
            page,
        ))
    }

    async fn insert_post(&self, post: NewPost) -> Result<PostRecord> {
        let mut state = self.state.write().await;
        let id = state.next_id();
        let now = Utc::now();
        let row = PostRow {
            id,
            author_id: post.author_id,
            title: post.title,
            content: post.content,
            tags: post.tags,
            created_at: now,
            updated_at: now,
        };
        let record = state.post_record(&row);
        state.posts.insert(id, row);
        Ok(record)
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>> {
        let state = self.state.read().await;
        Ok(state.posts.get(&id).map(|row| state.post_record(row)))
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<Option<PostRecord>> {
        let mut state = self.state.write().await;
        let Some(row) = state.posts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            row.title = title;
        }
        if let Some(content) = changes.content {
            row.content = content;
        }
        if let Some(tags) = changes.tags {
            row.tags = tags;
        }
        row.updated_at = Utc::now();

        let row = row.clone();
        Ok(Some(state.post_record(&row)))
    }

    async fn delete_post(&self, id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.posts.remove(&id).is_none() {
            return Ok(false);
        }
        state.comments.retain(|_, c| c.post_id != id);
        state.likes.retain(|(_, post), _| *post != id);
        Ok(true)
    }

    async fn list_posts(&self, filter: &PostFilter, page: PageRequest) -> Result<(Vec<PostRecord>, i64)> {
        let state = self.state.read().await;
        let followed: Option<HashSet<i64>> = filter.followed_by.map(|follower| {
            state
                .follows
                .iter()
                .filter(|e| e.follower_id == follower)
                .map(|e| e.followee_id)
                .collect()
        });

        let mut rows: Vec<&PostRow> = state
            .posts
            .values()
            .filter(|row| state.post_matches(row, filter, &followed))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = rows.len() as i64;
        let items = page
            .slice(&rows)
            .into_iter()
            .map(|row| state.post_record(row))
            .collect();
        Ok((items, total))
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<CommentRecord> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&comment.post_id) {
            return Err(AppError::field("post", "Post does not exist."));
        }
        let id = state.next_id();
        let now = Utc::now();
        let row = CommentRow {
            id,
            post_id: comment.post_id,
            author_id: comment.author_id,
            content: comment.content,
            created_at: now,
            updated_at: now,
        };
        let record = state.comment_record(&row);
        state.comments.insert(id, row);
        Ok(record)
    }

    async fn find_comment(&self, id: i64) -> Result<Option<CommentRecord>> {
        let state = self.state.read().await;
        Ok(state.comments.get(&id).map(|row| state.comment_record(row)))
    }

    async fn update_comment(&self, id: i64, content: String) -> Result<Option<CommentRecord>> {
        let mut state = self.state.write().await;
        let Some(row) = state.comments.get_mut(&id) else {
            return Ok(None);
        };
        row.content = content;
        row.updated_at = Utc::now();

        let row = row.clone();
        Ok(Some(state.comment_record(&row)))
    }

    async fn delete_comment(&self, id: i64) -> Result<bool> {
        Ok(self.state.write().await.comments.remove(&id).is_some())
    }

    async fn list_comments(&self, post_id: Option<i64>, page: PageRequest) -> Result<(Vec<CommentRecord>, i64)> {
        let state = self.state.read().await;
        let mut rows: Vec<&CommentRow> = state
            .comments
            .values()
            .filter(|c| post_id.map_or(true, |p| c.post_id == p))
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let total = rows.len() as i64;
        let items = page
            .slice(&rows)
            .into_iter()
            .map(|row| state.comment_record(row))
            .collect();
        Ok((items, total))
    }

    async fn insert_like_notifying(
        &self,
        user_id: i64,
        post_id: i64,
        notification: Option<NewNotification>,
    ) -> Result<Option<(Like, Option<NotificationRecord>)>> {
        let mut state = self.state.write().await;
        if state.likes.contains_key(&(user_id, post_id)) {
            return Ok(None);
        }
        if let Some(n) = &notification {
            state.require_users(&[n.recipient_id, n.actor_id])?;
        }

        let like = Like {
            id: state.next_id(),
            user_id,
            post_id,
            created_at: Utc::now(),
        };
        state.likes.insert((user_id, post_id), like.clone());
        let record = notification.map(|n| state.push_notification(n));
        Ok(Some((like, record)))
    }

    async fn delete_like(&self, user_id: i64, post_id: i64) -> Result<bool> {
        Ok(self
            .state
            .write()
            .await
            .likes
            .remove(&(user_id, post_id))
            .is_some())
    }

    async fn count_likes(&self, post_id: i64) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state.likes.keys().filter(|(_, post)| *post == post_id).count() as i64)
    }

    async fn insert_notification(&self, notification: NewNotification) -> Result<NotificationRecord> {
        let mut state = self.state.write().await;
        state.require_users(&[notification.recipient_id, notification.actor_id])?;
        Ok(state.push_notification(notification))
    }

    async fn list_notifications(
        &self,
        recipient_id: i64,
        unread_only: bool,
        page: PageRequest,
    ) -> Result<(Vec<NotificationRecord>, i64)> {
        let state = self.state.read().await;
        let mut rows: Vec<&NotificationRow> = state
            .notifications
            .values()
            .filter(|n| n.recipient_id == recipient_id && (!unread_only || !n.is_read))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = rows.len() as i64;
        let items = page
            .slice(&rows)
            .into_iter()
            .map(|row| state.notification_record(row))
            .collect();
        Ok((items, total))
    }

    async fn mark_notification_read(&self, recipient_id: i64, id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.notifications.get_mut(&id) {
            Some(row) if row.recipient_id == recipient_id => {
                row.is_read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, recipient_id: i64) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        for row in state.notifications.values_mut() {
            if row.recipient_id == recipient_id && !row.is_read {
                row.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn count_unread_notifications(&self, recipient_id: i64) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .notifications
            .values()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_users() -> (MemorySocialStore, i64, i64) {
        let store = MemorySocialStore::new();
        let mut ids = Vec::new();
        for name in ["alice", "bob"] {
            let user = store
                .create_user(NewUser {
                    username: name.into(),
                    email: format!("{name}@example.com"),
                    password_hash: "x".into(),
                    bio: String::new(),
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        (store, ids[0], ids[1])
    }

    fn new_post(author_id: i64, title: &str, tags: &[&str]) -> NewPost {
        NewPost {
            author_id,
            title: title.into(),
            content: format!("{title} body"),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let (store, _, _) = store_with_users().await;
        let err = store
            .create_user(NewUser {
                username: "alice".into(),
                email: "other@example.com".into(),
                password_hash: "x".into(),
                bio: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e.get("username").is_some()));
    }

    #[tokio::test]
    async fn test_follow_edge_is_unique() {
        let (store, a, b) = store_with_users().await;
        assert!(store.add_follow(a, b).await.unwrap());
        assert!(!store.add_follow(a, b).await.unwrap());
        assert_eq!(store.follow_counts(a).await.unwrap().following, 1);
        assert_eq!(store.follow_counts(b).await.unwrap().followers, 1);

        assert!(store.remove_follow(a, b).await.unwrap());
        assert!(!store.remove_follow(a, b).await.unwrap());
    }

    #[tokio::test]
    async fn test_like_get_or_create() {
        let (store, a, _) = store_with_users().await;
        let post = store.insert_post(new_post(a, "Hello", &[])).await.unwrap();

        assert!(store.insert_like_notifying(a, post.id, None).await.unwrap().is_some());
        assert!(store.insert_like_notifying(a, post.id, None).await.unwrap().is_none());
        assert_eq!(store.count_likes(post.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_like_and_notification_commit_together() {
        let (store, a, b) = store_with_users().await;
        let post = store.insert_post(new_post(a, "Hello", &[])).await.unwrap();
        let liked = |recipient_id| NewNotification {
            recipient_id,
            actor_id: b,
            verb: "liked your post".into(),
            target: Some(NotificationTarget::Post(post.id)),
        };

        // unknown recipient: neither row is written
        let err = tokio_test::assert_err!(
            store.insert_like_notifying(b, post.id, Some(liked(9_999))).await
        );
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(store.count_likes(post.id).await.unwrap(), 0);

        let (like, record) = store
            .insert_like_notifying(b, post.id, Some(liked(a)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(like.user_id, b);
        assert_eq!(record.unwrap().actor_username, "bob");

        // a duplicate like emits nothing
        assert!(store
            .insert_like_notifying(b, post.id, Some(liked(a)))
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.count_unread_notifications(a).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_posts_newest_first_with_filters() {
        let (store, a, b) = store_with_users().await;
        let first = store.insert_post(new_post(a, "Rust tips", &["rust"])).await.unwrap();
        let second = store.insert_post(new_post(b, "Gardening", &["plants"])).await.unwrap();

        let (all, total) = store
            .list_posts(&PostFilter::default(), PageRequest::new(1, 10))
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);

        let filter = PostFilter {
            search: agora_common::SearchTerm::parse(Some("RUST")),
            ..Default::default()
        };
        let (hits, _) = store.list_posts(&filter, PageRequest::new(1, 10)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].author_username, "alice");

        store.add_follow(a, b).await.unwrap();
        let feed = PostFilter {
            followed_by: Some(a),
            ..Default::default()
        };
        let (feed, _) = store.list_posts(&feed, PageRequest::new(1, 10)).await.unwrap();
        assert_eq!(feed.iter().map(|p| p.id).collect::<Vec<_>>(), vec![second.id]);
    }

    #[tokio::test]
    async fn test_delete_post_cascades() {
        let (store, a, b) = store_with_users().await;
        let post = store.insert_post(new_post(a, "Hello", &[])).await.unwrap();
        store
            .insert_comment(NewComment {
                post_id: post.id,
                author_id: b,
                content: "hi".into(),
            })
            .await
            .unwrap();
        store.insert_like_notifying(b, post.id, None).await.unwrap();

        assert!(store.delete_post(post.id).await.unwrap());
        let (comments, _) = store.list_comments(Some(post.id), PageRequest::new(1, 10)).await.unwrap();
        assert!(comments.is_empty());
        assert_eq!(store.count_likes(post.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_read_scoped_to_recipient() {
        let (store, a, b) = store_with_users().await;
        let n = store
            .insert_notification(NewNotification {
                recipient_id: a,
                actor_id: b,
                verb: "liked your post".into(),
                target: None,
            })
            .await
            .unwrap();

        assert!(!store.mark_notification_read(b, n.id).await.unwrap());
        assert_eq!(store.count_unread_notifications(a).await.unwrap(), 1);
        assert!(store.mark_notification_read(a, n.id).await.unwrap());
        assert_eq!(store.count_unread_notifications(a).await.unwrap(), 0);
    }
}
