/// Book handlers. Listing and detail are public; writes need a token.
use actix_middleware::AuthUser;
use actix_web::{web, HttpResponse};

use crate::catalog::{BookInput, BookPatch, BookQuery};
use crate::error::Result;
use crate::state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/books")
            .route("", web::get().to(list_books))
            .route("", web::post().to(create_book))
            .route("/{id}", web::get().to(get_book))
            .route("/{id}", web::put().to(replace_book))
            .route("/{id}", web::patch().to(update_book))
            .route("/{id}", web::delete().to(delete_book)),
    );
}

/// `?title=&author=&publication_year=&search=&ordering=`
pub async fn list_books(
    state: web::Data<AppState>,
    query: web::Query<BookQuery>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.catalog().list_books(query.into_inner()).await?))
}

pub async fn get_book(state: web::Data<AppState>, id: web::Path<i64>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.catalog().get_book(*id).await?))
}

pub async fn create_book(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<BookInput>,
) -> Result<HttpResponse> {
    let book = state.catalog().create_book(&user, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(book))
}

pub async fn replace_book(
    state: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<i64>,
    body: web::Json<BookInput>,
) -> Result<HttpResponse> {
    let book = state
        .catalog()
        .replace_book(&user, *id, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(book))
}

pub async fn update_book(
    state: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<i64>,
    body: web::Json<BookPatch>,
) -> Result<HttpResponse> {
    let book = state
        .catalog()
        .update_book(&user, *id, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(book))
}

pub async fn delete_book(
    state: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<i64>,
) -> Result<HttpResponse> {
    state.catalog().delete_book(&user, *id).await?;
    Ok(HttpResponse::NoContent().finish())
}
