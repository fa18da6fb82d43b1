use actix_middleware::JwtAuthMiddleware;
use actix_web::{http::StatusCode, test, web, App};
use chrono::Datelike;
use crypto_core::JwtKeys;
use serde_json::{json, Value};
use std::sync::Arc;

use catalog_service::handlers;
use catalog_service::repository::{CatalogStore, MemoryCatalogStore};
use catalog_service::AppState;

const SECRET: &str = "catalog-tests-secret";

/// Builds the app and a token for user 1
macro_rules! init_app {
    () => {{
        let keys = Arc::new(JwtKeys::from_secret(SECRET));
        let token = keys.generate_access_token(1, "curator").unwrap();
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryCatalogStore::new());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(store)))
                .wrap(JwtAuthMiddleware::new(keys))
                .configure(handlers::configure),
        )
        .await;
        (app, token)
    }};
}

macro_rules! post_json {
    ($app:expr, $token:expr, $uri:expr, $body:expr) => {{
        let req = test::TestRequest::post()
            .uri($uri)
            .insert_header(bearer(&$token))
            .set_json($body)
            .to_request();
        test::call_service(&$app, req).await
    }};
}

macro_rules! get_json {
    ($app:expr, $uri:expr) => {{
        let req = test::TestRequest::get().uri($uri).to_request();
        let body: Value = test::call_and_read_body_json(&$app, req).await;
        body
    }};
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

#[actix_web::test]
async fn test_book_crud() {
    let (app, token) = init_app!();

    let resp = post_json!(app, token, "/api/authors", json!({ "name": "Octavia Butler" }));
    assert_eq!(resp.status(), StatusCode::CREATED);
    let author: Value = test::read_body_json(resp).await;
    let author_id = author["id"].as_i64().unwrap();
    assert_eq!(author["books"], json!([]));

    let resp = post_json!(
        app,
        token,
        "/api/books",
        json!({ "title": "Kindred", "publication_year": 1979, "author": author_id })
    );
    assert_eq!(resp.status(), StatusCode::CREATED);
    let book: Value = test::read_body_json(resp).await;
    let book_id = book["id"].as_i64().unwrap();
    assert_eq!(book["author"], author_id);

    let fetched = get_json!(app, &format!("/api/books/{book_id}"));
    assert_eq!(fetched, book);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/books/{book_id}"))
        .insert_header(bearer(&token))
        .set_json(json!({ "title": "Kindred (Anniversary Edition)" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let patched: Value = test::read_body_json(resp).await;
    assert_eq!(patched["publication_year"], 1979);

    let req = test::TestRequest::put()
        .uri(&format!("/api/books/{book_id}"))
        .insert_header(bearer(&token))
        .set_json(json!({ "title": "Kindred", "publication_year": 1980, "author": author_id }))
        .to_request();
    let replaced: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(replaced["publication_year"], 1980);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/books/{book_id}"))
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&format!("/api/books/{book_id}"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_writes_require_authentication() {
    let (app, _) = init_app!();

    for uri in ["/api/books", "/api/authors", "/api/libraries"] {
        let req = test::TestRequest::post()
            .uri(uri)
            .set_json(json!({ "name": "x", "title": "x", "publication_year": 2000, "author": 1 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }

    let books = get_json!(app, "/api/books");
    assert_eq!(books, json!([]));
}

#[actix_web::test]
async fn test_future_publication_year_rejected() {
    let (app, token) = init_app!();
    let resp = post_json!(app, token, "/api/authors", json!({ "name": "Someone" }));
    let author: Value = test::read_body_json(resp).await;

    let next_year = chrono::Utc::now().year() + 1;
    let resp = post_json!(
        app,
        token,
        "/api/books",
        json!({ "title": "Not Yet", "publication_year": next_year, "author": author["id"] })
    );
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["errors"]["publication_year"],
        json!(["publication year cannot be greater than current year"])
    );
}

#[actix_web::test]
async fn test_blank_title_rejected() {
    let (app, token) = init_app!();
    let resp = post_json!(app, token, "/api/authors", json!({ "name": "   " }));
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"]["name"], json!(["This field may not be blank."]));

    let resp = post_json!(app, token, "/api/authors", json!({ "name": " Someone " }));
    let author: Value = test::read_body_json(resp).await;
    assert_eq!(author["name"], "Someone");

    let resp = post_json!(
        app,
        token,
        "/api/books",
        json!({ "title": "   ", "publication_year": 2000, "author": author["id"] })
    );
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"]["title"], json!(["This field may not be blank."]));

    let books = get_json!(app, "/api/books");
    assert_eq!(books, json!([]));
}

#[actix_web::test]
async fn test_unknown_author_rejected() {
    let (app, token) = init_app!();
    let resp = post_json!(
        app,
        token,
        "/api/books",
        json!({ "title": "Orphan", "publication_year": 2000, "author": 9999 })
    );
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["errors"]["author"].is_array());
}

#[actix_web::test]
async fn test_book_filters_and_ordering() {
    let (app, token) = init_app!();
    let resp = post_json!(app, token, "/api/authors", json!({ "name": "Ursula K. Le Guin" }));
    let le_guin: Value = test::read_body_json(resp).await;
    let resp = post_json!(app, token, "/api/authors", json!({ "name": "Frank Herbert" }));
    let herbert: Value = test::read_body_json(resp).await;

    for (title, year, author) in [
        ("A Wizard of Earthsea", 1968, &le_guin),
        ("The Left Hand of Darkness", 1969, &le_guin),
        ("Dune", 1965, &herbert),
    ] {
        let resp = post_json!(
            app,
            token,
            "/api/books",
            json!({ "title": title, "publication_year": year, "author": author["id"] })
        );
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let titles = |body: &Value| -> Vec<String> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|b| b["title"].as_str().unwrap().to_string())
            .collect()
    };

    let body = get_json!(app, "/api/books?title=Dune");
    assert_eq!(titles(&body), vec!["Dune"]);

    let body = get_json!(app, "/api/books?search=guin");
    assert_eq!(body.as_array().unwrap().len(), 2);

    let body = get_json!(app, "/api/books?publication_year=1969");
    assert_eq!(titles(&body), vec!["The Left Hand of Darkness"]);

    let body = get_json!(app, &format!("/api/books?author={}", herbert["id"]));
    assert_eq!(titles(&body), vec!["Dune"]);

    let body = get_json!(app, "/api/books?ordering=-publication_year");
    assert_eq!(
        titles(&body),
        vec!["The Left Hand of Darkness", "A Wizard of Earthsea", "Dune"]
    );

    let body = get_json!(app, "/api/books?ordering=title");
    assert_eq!(
        titles(&body),
        vec!["A Wizard of Earthsea", "Dune", "The Left Hand of Darkness"]
    );

    // unknown ordering falls back to id order
    let body = get_json!(app, "/api/books?ordering=rating");
    assert_eq!(
        titles(&body),
        vec!["A Wizard of Earthsea", "The Left Hand of Darkness", "Dune"]
    );

    let authors = get_json!(app, "/api/authors");
    assert_eq!(authors[0]["books"].as_array().unwrap().len(), 2);
    assert_eq!(authors[1]["books"][0]["title"], "Dune");
}

#[actix_web::test]
async fn test_library_membership_and_librarian() {
    let (app, token) = init_app!();
    let resp = post_json!(app, token, "/api/authors", json!({ "name": "Author" }));
    let author: Value = test::read_body_json(resp).await;
    let resp = post_json!(
        app,
        token,
        "/api/books",
        json!({ "title": "Shelved", "publication_year": 2005, "author": author["id"] })
    );
    let book: Value = test::read_body_json(resp).await;
    let book_id = book["id"].as_i64().unwrap();

    let resp = post_json!(app, token, "/api/libraries", json!({ "name": "Central" }));
    assert_eq!(resp.status(), StatusCode::CREATED);
    let library: Value = test::read_body_json(resp).await;
    let library_id = library["id"].as_i64().unwrap();
    assert_eq!(library["librarian"], Value::Null);

    for _ in 0..2 {
        let req = test::TestRequest::put()
            .uri(&format!("/api/libraries/{library_id}/books/{book_id}"))
            .insert_header(bearer(&token))
            .to_request();
        let view: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(view["books"].as_array().unwrap().len(), 1);
    }

    for name in ["Ann", "Ben"] {
        let req = test::TestRequest::put()
            .uri(&format!("/api/libraries/{library_id}/librarian"))
            .insert_header(bearer(&token))
            .set_json(json!({ "name": name }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let view = get_json!(app, &format!("/api/libraries/{library_id}"));
    assert_eq!(view["librarian"]["name"], "Ben");

    // deleting the book removes it from the library
    let req = test::TestRequest::delete()
        .uri(&format!("/api/books/{book_id}"))
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let view = get_json!(app, &format!("/api/libraries/{library_id}"));
    assert_eq!(view["books"], json!([]));

    let req = test::TestRequest::delete()
        .uri(&format!("/api/libraries/{library_id}/books/{book_id}"))
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let libraries = get_json!(app, "/api/libraries");
    assert_eq!(libraries.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn test_non_numeric_id_is_not_found() {
    let (app, _) = init_app!();
    let req = test::TestRequest::get().uri("/api/books/abc").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}
