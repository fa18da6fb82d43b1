/// HTTP handlers for social-service
///
/// - Accounts: registration, login, profiles, follow/unfollow
/// - Posts: CRUD, search, like/unlike
/// - Comments: CRUD scoped by post
/// - Notifications: inbox and read state
/// - Feed: posts from followed users
pub mod accounts;
pub mod comments;
pub mod feed;
pub mod health;
pub mod notifications;
pub mod posts;

use actix_web::web;

use crate::error::AppError;
use crate::metrics::serve_metrics;

/// Extractor failures render through the same JSON error envelope as handlers.
pub fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|_err, _req| AppError::NotFound("Not found.".to_string()).into()),
    );
}

/// Register every route of the service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    extractor_configs(cfg);

    cfg.route("/health", web::get().to(health::health))
        .route("/ready", web::get().to(health::ready))
        .route("/metrics", web::get().to(serve_metrics))
        .service(
            web::scope("/api")
                .configure(accounts::configure)
                .configure(posts::configure)
                .configure(comments::configure)
                .configure(notifications::configure)
                .configure(feed::configure),
        );
}
