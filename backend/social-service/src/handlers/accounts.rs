/// Account handlers - registration, login, profiles and the follow graph
use actix_middleware::Principal;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::Result;
use crate::services::accounts::{LoginInput, RegisterInput};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/accounts")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/profile", web::get().to(get_profile))
            .route("/profile", web::patch().to(update_profile))
            .route("/users/{id}", web::get().to(get_user))
            .route("/users/{id}/followers", web::get().to(list_followers))
            .route("/users/{id}/following", web::get().to(list_following))
            .route("/follow/{id}", web::post().to(follow))
            .route("/unfollow/{id}", web::post().to(unfollow)),
    );
}

/// Register a new account and return a token for it
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterInput>,
) -> Result<HttpResponse> {
    let payload = state.accounts().register(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(payload))
}

pub async fn login(state: web::Data<AppState>, body: web::Json<LoginInput>) -> Result<HttpResponse> {
    let payload = state.accounts().login(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(payload))
}

pub async fn get_profile(state: web::Data<AppState>, principal: Principal) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.accounts().profile(&principal).await?))
}

pub async fn update_profile(
    state: web::Data<AppState>,
    principal: Principal,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse> {
    let user = state
        .accounts()
        .update_profile(&principal, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn get_user(state: web::Data<AppState>, user_id: web::Path<i64>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.accounts().public_profile(*user_id).await?))
}

pub async fn list_followers(
    state: web::Data<AppState>,
    user_id: web::Path<i64>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = state.page(query.page, query.page_size)?;
    Ok(HttpResponse::Ok().json(state.graph().followers(*user_id, page).await?))
}

pub async fn list_following(
    state: web::Data<AppState>,
    user_id: web::Path<i64>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = state.page(query.page, query.page_size)?;
    Ok(HttpResponse::Ok().json(state.graph().following(*user_id, page).await?))
}

/// Follow a user; repeating the call is harmless
pub async fn follow(
    state: web::Data<AppState>,
    principal: Principal,
    user_id: web::Path<i64>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.graph().follow(&principal, *user_id).await?))
}

pub async fn unfollow(
    state: web::Data<AppState>,
    principal: Principal,
    user_id: web::Path<i64>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.graph().unfollow(&principal, *user_id).await?))
}
