use actix_middleware::Principal;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/feed", web::get().to(get_feed));
}

/// Posts from followed users, newest first
pub async fn get_feed(
    state: web::Data<AppState>,
    principal: Principal,
    query: web::Query<FeedParams>,
) -> Result<HttpResponse> {
    let page = state.page(query.page, query.page_size)?;
    Ok(HttpResponse::Ok().json(state.feed().feed(&principal, page).await?))
}
