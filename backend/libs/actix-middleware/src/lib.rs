//! # Actix Middleware Library
//!
//! Authentication components shared by the Agora actix services.
//!
//! ## Modules
//! - `jwt_auth`: JWT authentication middleware and the `Principal` / `AuthUser` extractors

pub mod jwt_auth;

pub use jwt_auth::{AuthError, AuthUser, JwtAuthMiddleware, Principal};
