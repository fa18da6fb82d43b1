//! Catalog service: books, authors, libraries and librarians over HTTP.

pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
