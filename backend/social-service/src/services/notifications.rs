//! Notification inbox.
//!
//! Targets are stored as a `(kind, id)` pair and resolved to a display label
//! through an explicit per-kind lookup, memoized for the page being rendered.
use actix_middleware::Principal;
use agora_common::{PageRequest, PagedResponse};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::models::{NotificationRecord, NotificationTarget, UserRef};
use crate::domain::views::{NotificationView, TargetView};
use crate::error::{AppError, Result};
use crate::permissions;
use crate::repository::SocialStore;

const LABEL_MAX_CHARS: usize = 80;

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn SocialStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self { store }
    }

    /// Caller's notifications, newest first
    pub async fn list(
        &self,
        actor: &Principal,
        unread_only: bool,
        page: PageRequest,
    ) -> Result<PagedResponse<NotificationView>> {
        let user = permissions::require_user(actor)?;
        let (records, total) = self
            .store
            .list_notifications(user.id, unread_only, page)
            .await?;

        let mut labels: HashMap<NotificationTarget, Option<String>> = HashMap::new();
        let mut items = Vec::with_capacity(records.len());
        for record in records {
            let target = match record.target() {
                Some(target) => {
                    let label = match labels.get(&target) {
                        Some(label) => label.clone(),
                        None => {
                            let label = self.resolve_label(target).await?;
                            labels.insert(target, label.clone());
                            label
                        }
                    };
                    Some(TargetView {
                        kind: target.kind(),
                        id: target.id(),
                        label,
                    })
                }
                None => None,
            };
            items.push(view(record, target));
        }

        Ok(PagedResponse::new(items, total, page))
    }

    pub async fn unread_count(&self, actor: &Principal) -> Result<i64> {
        let user = permissions::require_user(actor)?;
        self.store.count_unread_notifications(user.id).await
    }

    /// Someone else's notification looks exactly like a missing one.
    pub async fn mark_read(&self, actor: &Principal, id: i64) -> Result<()> {
        let user = permissions::require_user(actor)?;
        if self.store.mark_notification_read(user.id, id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("Notification"))
        }
    }

    pub async fn mark_all_read(&self, actor: &Principal) -> Result<u64> {
        let user = permissions::require_user(actor)?;
        let updated = self.store.mark_all_notifications_read(user.id).await?;
        tracing::debug!(user_id = user.id, updated, "notifications marked read");
        Ok(updated)
    }

    async fn resolve_label(&self, target: NotificationTarget) -> Result<Option<String>> {
        let label = match target {
            NotificationTarget::Post(id) => self.store.find_post(id).await?.map(|p| p.title),
            NotificationTarget::Comment(id) => self
                .store
                .find_comment(id)
                .await?
                .map(|c| truncate(&c.content)),
        };
        Ok(label)
    }
}

const ELLIPSIS: &str = "...";

/// Comment labels are capped at `LABEL_MAX_CHARS` chars, ASCII ellipsis included
fn truncate(text: &str) -> String {
    if text.chars().count() <= LABEL_MAX_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(LABEL_MAX_CHARS - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}

fn view(record: NotificationRecord, target: Option<TargetView>) -> NotificationView {
    NotificationView {
        id: record.id,
        actor: UserRef {
            id: record.actor_id,
            username: record.actor_username,
        },
        verb: record.verb,
        target,
        is_read: record.is_read,
        timestamp: record.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{NewNotification, NewPost, NewUser};
    use crate::repository::MemorySocialStore;
    use actix_middleware::AuthUser;

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

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short"), "short");
        let long = "y".repeat(200);
        let label = truncate(&long);
        assert_eq!(label.chars().count(), LABEL_MAX_CHARS);
        assert!(label.ends_with("yyy..."));
        assert!(label.is_ascii());

        // multi-byte input is cut on char boundaries
        let accented = "é".repeat(LABEL_MAX_CHARS + 1);
        assert_eq!(truncate(&accented).chars().count(), LABEL_MAX_CHARS);
        assert_eq!(truncate(&"z".repeat(LABEL_MAX_CHARS)), "z".repeat(LABEL_MAX_CHARS));
    }

    #[tokio::test]
    async fn test_list_resolves_targets_newest_first() {
        let store: Arc<dyn SocialStore> = Arc::new(MemorySocialStore::new());
        let me = principal(&store, "me").await;
        let other = principal(&store, "other").await;
        let post = store
            .insert_post(NewPost {
                author_id: me.id().unwrap(),
                title: "Hello".into(),
                content: "world".into(),
                tags: vec![],
            })
            .await
            .unwrap();

        for target in [Some(NotificationTarget::Post(post.id)), Some(NotificationTarget::Post(999))] {
            store
                .insert_notification(NewNotification {
                    recipient_id: me.id().unwrap(),
                    actor_id: other.id().unwrap(),
                    verb: "liked your post".into(),
                    target,
                })
                .await
                .unwrap();
        }

        let service = NotificationService::new(store);
        let page = service.list(&me, false, PageRequest::new(1, 10)).await.unwrap();
        assert_eq!(page.total, 2);
        // newest first: the dangling target was inserted last
        let dangling = page.items[0].target.as_ref().unwrap();
        assert_eq!(dangling.id, 999);
        assert_eq!(dangling.label, None);
        let live = page.items[1].target.as_ref().unwrap();
        assert_eq!(live.kind, "post");
        assert_eq!(live.label.as_deref(), Some("Hello"));
        assert_eq!(page.items[1].actor.username, "other");

        assert!(service.list(&other, false, PageRequest::new(1, 10)).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_flow() {
        let store: Arc<dyn SocialStore> = Arc::new(MemorySocialStore::new());
        let me = principal(&store, "me").await;
        let other = principal(&store, "other").await;
        let n = store
            .insert_notification(NewNotification {
                recipient_id: me.id().unwrap(),
                actor_id: other.id().unwrap(),
                verb: "liked your post".into(),
                target: None,
            })
            .await
            .unwrap();

        let service = NotificationService::new(store);
        assert_eq!(service.unread_count(&me).await.unwrap(), 1);
        assert!(matches!(service.mark_read(&other, n.id).await, Err(AppError::NotFound(_))));
        service.mark_read(&me, n.id).await.unwrap();
        assert_eq!(service.unread_count(&me).await.unwrap(), 0);
        assert!(service.list(&me, true, PageRequest::new(1, 10)).await.unwrap().items.is_empty());
        assert_eq!(service.mark_all_read(&me).await.unwrap(), 0);
    }
}
