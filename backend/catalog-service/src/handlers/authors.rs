use actix_middleware::AuthUser;
use actix_web::{web, HttpResponse};

use crate::catalog::NameInput;
use crate::error::Result;
use crate::state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/authors")
            .route("", web::get().to(list_authors))
            .route("", web::post().to(create_author))
            .route("/{id}", web::get().to(get_author)),
    );
}

/// Authors with their books nested
pub async fn list_authors(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.catalog().list_authors().await?))
}

pub async fn get_author(state: web::Data<AppState>, id: web::Path<i64>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.catalog().get_author(*id).await?))
}

pub async fn create_author(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<NameInput>,
) -> Result<HttpResponse> {
    let author = state.catalog().create_author(&user, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(author))
}
