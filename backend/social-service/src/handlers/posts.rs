/// Post handlers - HTTP endpoints for post operations
use actix_middleware::Principal;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::services::posts::PostQuery;
use crate::services::{LikeOutcome, UnlikeOutcome};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PostListParams {
    pub search: Option<String>,
    pub tag: Option<String>,
    pub author: Option<i64>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/posts")
            .route("", web::get().to(list_posts))
            .route("", web::post().to(create_post))
            .route("/{id}", web::get().to(get_post))
            .route("/{id}", web::put().to(replace_post))
            .route("/{id}", web::patch().to(update_post))
            .route("/{id}", web::delete().to(delete_post))
            .route("/{id}/like", web::post().to(like_post))
            .route("/{id}/unlike", web::post().to(unlike_post)),
    );
}

/// List posts, newest first
pub async fn list_posts(
    state: web::Data<AppState>,
    query: web::Query<PostListParams>,
) -> Result<HttpResponse> {
    let params = query.into_inner();
    let page = state.page(params.page, params.page_size)?;
    let filter = PostQuery {
        search: params.search,
        tag: params.tag,
        author: params.author,
    };
    Ok(HttpResponse::Ok().json(state.posts().list(filter, page).await?))
}

/// Create a new post owned by the caller
pub async fn create_post(
    state: web::Data<AppState>,
    principal: Principal,
    body: web::Json<Value>,
) -> Result<HttpResponse> {
    let post = state.posts().create(&principal, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(post))
}

pub async fn get_post(state: web::Data<AppState>, post_id: web::Path<i64>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.posts().get(*post_id).await?))
}

/// Full update (PUT)
pub async fn replace_post(
    state: web::Data<AppState>,
    principal: Principal,
    post_id: web::Path<i64>,
    body: web::Json<Value>,
) -> Result<HttpResponse> {
    let post = state
        .posts()
        .replace(&principal, *post_id, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

/// Partial update (PATCH)
pub async fn update_post(
    state: web::Data<AppState>,
    principal: Principal,
    post_id: web::Path<i64>,
    body: web::Json<Value>,
) -> Result<HttpResponse> {
    let post = state
        .posts()
        .update(&principal, *post_id, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

pub async fn delete_post(
    state: web::Data<AppState>,
    principal: Principal,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    state.posts().delete(&principal, *post_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn like_post(
    state: web::Data<AppState>,
    principal: Principal,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    match state.engagement().like(&principal, *post_id).await? {
        LikeOutcome::Created(_) => {
            Ok(HttpResponse::Created().json(serde_json::json!({ "detail": "Post liked" })))
        }
        LikeOutcome::AlreadyLiked => Err(AppError::Conflict("Already liked".to_string())),
    }
}

pub async fn unlike_post(
    state: web::Data<AppState>,
    principal: Principal,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    match state.engagement().unlike(&principal, *post_id).await? {
        UnlikeOutcome::Removed => {
            Ok(HttpResponse::Ok().json(serde_json::json!({ "detail": "Post unliked" })))
        }
        UnlikeOutcome::NotLiked => Err(AppError::BadRequest(
            "You haven't liked this post".to_string(),
        )),
    }
}
