use agora_common::PageRequest;
use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::{PgExecutor, PgPool, PgPoolOptions, Postgres};
use sqlx::QueryBuilder;
use std::time::Duration;

use super::SocialStore;
use crate::config::DatabaseConfig;
use crate::domain::models::{
    CommentRecord, FollowCounts, Like, NewComment, NewNotification, NewPost, NewUser,
    NotificationRecord, PostChanges, PostFilter, PostRecord, User, UserChanges, UserRef,
};
use crate::error::{AppError, Result};

const POST_SELECT: &str = r#"
    SELECT p.id, p.author_id, u.username AS author_username, p.title, p.content, p.tags,
           p.created_at, p.updated_at,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments_count,
           (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS likes_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.content,
           c.created_at, c.updated_at
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

const USER_COLUMNS: &str = "id, username, email, password_hash, bio, created_at";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgSocialStore {
    pool: PgPool,
}

impl PgSocialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig, url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn user_refs(
        &self,
        join_column: &str,
        match_column: &str,
        user_id: i64,
        page: PageRequest,
    ) -> Result<(Vec<UserRef>, i64)> {
        let list_sql = format!(
            "SELECT u.id, u.username FROM follows f JOIN users u ON u.id = f.{join_column} \
             WHERE f.{match_column} = $1 ORDER BY f.created_at DESC, u.id DESC LIMIT $2 OFFSET $3"
        );
        let items = sqlx::query_as::<_, UserRef>(&list_sql)
            .bind(user_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM follows WHERE {match_column} = $1");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((items, total))
    }
}

fn push_post_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    if let Some(term) = &filter.search {
        let pattern = term.like_pattern();
        qb.push(" AND (p.title ILIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR p.content ILIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR EXISTS (SELECT 1 FROM unnest(p.tags) AS t(tag) WHERE t.tag ILIKE ")
            .push_bind(pattern)
            .push(r" ESCAPE '\'))");
    }
    if let Some(tag) = &filter.tag {
        qb.push(" AND ").push_bind(tag.clone()).push(" = ANY(p.tags)");
    }
    if let Some(author_id) = filter.author_id {
        qb.push(" AND p.author_id = ").push_bind(author_id);
    }
    if let Some(follower_id) = filter.followed_by {
        qb.push(" AND p.author_id IN (SELECT followee_id FROM follows WHERE follower_id = ")
            .push_bind(follower_id)
            .push(")");
    }
}

/// Unique violations on `users` surface as field errors
fn map_user_conflict(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some(c) if c.contains("email") => {
                    AppError::field("email", "A user with that email already exists.")
                }
                _ => AppError::field("username", "A user with that username already exists."),
            };
        }
    }
    AppError::Database(err)
}

async fn insert_notification_in<'e, E>(executor: E, notification: NewNotification) -> Result<NotificationRecord>
where
    E: PgExecutor<'e>,
{
    let record = sqlx::query_as::<_, NotificationRecord>(
        r#"
        WITH inserted AS (
            INSERT INTO notifications (recipient_id, actor_id, verb, target_kind, target_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
        )
        SELECT n.id, n.recipient_id, n.actor_id, u.username AS actor_username, n.verb,
               n.target_kind, n.target_id, n.is_read, n.created_at
        FROM inserted n
        JOIN users u ON u.id = n.actor_id
        "#,
    )
    .bind(notification.recipient_id)
    .bind(notification.actor_id)
    .bind(notification.verb)
    .bind(notification.target.map(|t| t.kind()))
    .bind(notification.target.map(|t| t.id()))
    .fetch_one(executor)
    .await?;
    Ok(record)
}

#[async_trait]
impl SocialStore for PgSocialStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, bio) VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.username)
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.bio)
            .fetch_one(&self.pool)
            .await
            .map_err(map_user_conflict)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<Option<User>> {
        let sql = format!(
            "UPDATE users SET email = COALESCE($2, email), bio = COALESCE($3, bio) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.email)
            .bind(changes.bio)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_user_conflict)
    }

    async fn add_follow(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        let affected = sqlx::query(
            r#"
            INSERT INTO follows (follower_id, followee_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (follower_id, followee_id) DO NOTHING
            "#,
        )
        .bind(follower_id)
        .bind(followee_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected > 0)
    }

    async fn remove_follow(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        let affected = sqlx::query(
            r#"
            DELETE FROM follows
            WHERE follower_id = $1 AND followee_id = $2
            "#,
        )
        .bind(follower_id)
        .bind(followee_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected > 0)
    }

    async fn is_following(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND followee_id = $2)",
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn follow_counts(&self, user_id: i64) -> Result<FollowCounts> {
        let (followers, following): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM follows WHERE followee_id = $1),
                (SELECT COUNT(*) FROM follows WHERE follower_id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(FollowCounts {
            followers,
            following,
        })
    }

    async fn list_followers(&self, user_id: i64, page: PageRequest) -> Result<(Vec<UserRef>, i64)> {
        self.user_refs("follower_id", "followee_id", user_id, page).await
    }

    async fn list_following(&self, user_id: i64, page: PageRequest) -> Result<(Vec<UserRef>, i64)> {
        self.user_refs("followee_id", "follower_id", user_id, page).await
    }

    async fn insert_post(&self, post: NewPost) -> Result<PostRecord> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO posts (author_id, title, content, tags)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(post.author_id)
        .bind(post.title)
        .bind(post.content)
        .bind(post.tags)
        .fetch_one(&self.pool)
        .await?;

        self.find_post(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("post {id} vanished after insert")))
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>> {
        let sql = format!("{POST_SELECT} WHERE p.id = $1");
        Ok(sqlx::query_as::<_, PostRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<Option<PostRecord>> {
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                tags = COALESCE($4, tags),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.content)
        .bind(changes.tags)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(id) => self.find_post(id).await,
            None => Ok(None),
        }
    }

    async fn delete_post(&self, id: i64) -> Result<bool> {
        let affected = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn list_posts(&self, filter: &PostFilter, page: PageRequest) -> Result<(Vec<PostRecord>, i64)> {
        let mut qb = QueryBuilder::<Postgres>::new(POST_SELECT);
        qb.push(" WHERE TRUE");
        push_post_filters(&mut qb, filter);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = qb.build_query_as::<PostRecord>().fetch_all(&self.pool).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p WHERE TRUE");
        push_post_filters(&mut count, filter);
        let (total,) = count.build_query_as::<(i64,)>().fetch_one(&self.pool).await?;

        Ok((items, total))
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<CommentRecord> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO comments (post_id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(comment.content)
        .fetch_one(&self.pool)
        .await?;

        self.find_comment(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("comment {id} vanished after insert")))
    }

    async fn find_comment(&self, id: i64) -> Result<Option<CommentRecord>> {
        let sql = format!("{COMMENT_SELECT} WHERE c.id = $1");
        Ok(sqlx::query_as::<_, CommentRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_comment(&self, id: i64, content: String) -> Result<Option<CommentRecord>> {
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE comments
            SET content = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(id) => self.find_comment(id).await,
            None => Ok(None),
        }
    }

    async fn delete_comment(&self, id: i64) -> Result<bool> {
        let affected = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn list_comments(&self, post_id: Option<i64>, page: PageRequest) -> Result<(Vec<CommentRecord>, i64)> {
        let sql = format!(
            "{COMMENT_SELECT} WHERE ($1::BIGINT IS NULL OR c.post_id = $1) \
             ORDER BY c.created_at ASC, c.id ASC LIMIT $2 OFFSET $3"
        );
        let items = sqlx::query_as::<_, CommentRecord>(&sql)
            .bind(post_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comments WHERE ($1::BIGINT IS NULL OR post_id = $1)",
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((items, total))
    }

    async fn insert_like_notifying(
        &self,
        user_id: i64,
        post_id: i64,
        notification: Option<NewNotification>,
    ) -> Result<Option<(Like, Option<NotificationRecord>)>> {
        let mut tx = self.pool.begin().await?;

        let like = sqlx::query_as::<_, Like>(
            r#"
            INSERT INTO likes (user_id, post_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, post_id) DO NOTHING
            RETURNING id, user_id, post_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(like) = like else {
            tx.rollback().await?;
            return Ok(None);
        };
        let record = match notification {
            Some(n) => Some(insert_notification_in(&mut *tx, n).await?),
            None => None,
        };

        tx.commit().await?;
        Ok(Some((like, record)))
    }

    async fn delete_like(&self, user_id: i64, post_id: i64) -> Result<bool> {
        let affected = sqlx::query(
            r#"
            DELETE FROM likes
            WHERE user_id = $1 AND post_id = $2
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected > 0)
    }

    async fn count_likes(&self, post_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_notification(&self, notification: NewNotification) -> Result<NotificationRecord> {
        insert_notification_in(&self.pool, notification).await
    }

    async fn list_notifications(
        &self,
        recipient_id: i64,
        unread_only: bool,
        page: PageRequest,
    ) -> Result<(Vec<NotificationRecord>, i64)> {
        let items = sqlx::query_as::<_, NotificationRecord>(
            r#"
            SELECT n.id, n.recipient_id, n.actor_id, u.username AS actor_username, n.verb,
                   n.target_kind, n.target_id, n.is_read, n.created_at
            FROM notifications n
            JOIN users u ON u.id = n.actor_id
            WHERE n.recipient_id = $1 AND (NOT $2 OR n.is_read = FALSE)
            ORDER BY n.created_at DESC, n.id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(recipient_id)
        .bind(unread_only)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND (NOT $2 OR is_read = FALSE)",
        )
        .bind(recipient_id)
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await?;

        Ok((items, total))
    }

    async fn mark_notification_read(&self, recipient_id: i64, id: i64) -> Result<bool> {
        let affected = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND recipient_id = $2",
        )
        .bind(id)
        .bind(recipient_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected > 0)
    }

    async fn mark_all_notifications_read(&self, recipient_id: i64) -> Result<u64> {
        let affected = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected)
    }

    async fn count_unread_notifications(&self, recipient_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
