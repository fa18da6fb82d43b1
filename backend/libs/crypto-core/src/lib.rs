//! Credential primitives shared by the Agora services.
//!
//! - `jwt`: HS256 access token issuing and validation
//! - `password`: Argon2id password hashing

pub mod jwt;
pub mod password;

pub use jwt::{Claims, JwtKeys};
