use actix_middleware::Principal;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationListParams {
    #[serde(default)]
    pub unread: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/notifications")
            .route("", web::get().to(list_notifications))
            .route("/unread-count", web::get().to(unread_count))
            .route("/read-all", web::post().to(mark_all_read))
            .route("/{id}/read", web::patch().to(mark_read)),
    );
}

/// Caller's notifications, newest first
pub async fn list_notifications(
    state: web::Data<AppState>,
    principal: Principal,
    query: web::Query<NotificationListParams>,
) -> Result<HttpResponse> {
    let page = state.page(query.page, query.page_size)?;
    let notifications = state
        .notifications()
        .list(&principal, query.unread, page)
        .await?;
    Ok(HttpResponse::Ok().json(notifications))
}

pub async fn unread_count(state: web::Data<AppState>, principal: Principal) -> Result<HttpResponse> {
    let count = state.notifications().unread_count(&principal).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "unread": count })))
}

pub async fn mark_read(
    state: web::Data<AppState>,
    principal: Principal,
    notification_id: web::Path<i64>,
) -> Result<HttpResponse> {
    state
        .notifications()
        .mark_read(&principal, *notification_id)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "detail": "Notification marked as read" })))
}

pub async fn mark_all_read(state: web::Data<AppState>, principal: Principal) -> Result<HttpResponse> {
    let updated = state.notifications().mark_all_read(&principal).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "updated": updated })))
}
