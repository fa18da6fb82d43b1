use actix_middleware::Principal;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CommentListParams {
    pub post: Option<i64>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/comments")
            .route("", web::get().to(list_comments))
            .route("", web::post().to(create_comment))
            .route("/{id}", web::get().to(get_comment))
            .route("/{id}", web::put().to(replace_comment))
            .route("/{id}", web::patch().to(update_comment))
            .route("/{id}", web::delete().to(delete_comment)),
    );
}

pub async fn list_comments(
    state: web::Data<AppState>,
    query: web::Query<CommentListParams>,
) -> Result<HttpResponse> {
    let page = state.page(query.page, query.page_size)?;
    Ok(HttpResponse::Ok().json(state.comments().list(query.post, page).await?))
}

pub async fn create_comment(
    state: web::Data<AppState>,
    principal: Principal,
    body: web::Json<Value>,
) -> Result<HttpResponse> {
    let comment = state.comments().create(&principal, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(comment))
}

pub async fn get_comment(state: web::Data<AppState>, comment_id: web::Path<i64>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.comments().get(*comment_id).await?))
}

pub async fn replace_comment(
    state: web::Data<AppState>,
    principal: Principal,
    comment_id: web::Path<i64>,
    body: web::Json<Value>,
) -> Result<HttpResponse> {
    let comment = state
        .comments()
        .replace(&principal, *comment_id, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(comment))
}

pub async fn update_comment(
    state: web::Data<AppState>,
    principal: Principal,
    comment_id: web::Path<i64>,
    body: web::Json<Value>,
) -> Result<HttpResponse> {
    let comment = state
        .comments()
        .update(&principal, *comment_id, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(comment))
}

pub async fn delete_comment(
    state: web::Data<AppState>,
    principal: Principal,
    comment_id: web::Path<i64>,
) -> Result<HttpResponse> {
    state.comments().delete(&principal, *comment_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
