//! Social service: accounts, follow graph, posts, comments, likes,
//! notifications and the home feed over HTTP.

pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod permissions;
pub mod repository;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
