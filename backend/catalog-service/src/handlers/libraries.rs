use actix_middleware::AuthUser;
use actix_web::{web, HttpResponse};

use crate::catalog::NameInput;
use crate::error::Result;
use crate::state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/libraries")
            .route("", web::get().to(list_libraries))
            .route("", web::post().to(create_library))
            .route("/{id}", web::get().to(get_library))
            .route("/{id}/books/{book_id}", web::put().to(add_book))
            .route("/{id}/books/{book_id}", web::delete().to(remove_book))
            .route("/{id}/librarian", web::put().to(assign_librarian)),
    );
}

pub async fn list_libraries(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.catalog().list_libraries().await?))
}

pub async fn get_library(state: web::Data<AppState>, id: web::Path<i64>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.catalog().get_library(*id).await?))
}

pub async fn create_library(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<NameInput>,
) -> Result<HttpResponse> {
    let library = state.catalog().create_library(&user, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(library))
}

pub async fn add_book(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let (library_id, book_id) = path.into_inner();
    let library = state.catalog().add_book(&user, library_id, book_id).await?;
    Ok(HttpResponse::Ok().json(library))
}

pub async fn remove_book(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let (library_id, book_id) = path.into_inner();
    let library = state.catalog().remove_book(&user, library_id, book_id).await?;
    Ok(HttpResponse::Ok().json(library))
}

/// Replaces the current librarian, if any
pub async fn assign_librarian(
    state: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<i64>,
    body: web::Json<NameInput>,
) -> Result<HttpResponse> {
    let librarian = state
        .catalog()
        .assign_librarian(&user, *id, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(librarian))
}
