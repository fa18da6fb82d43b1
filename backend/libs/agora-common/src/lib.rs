//! Agora Common Library
//!
//! Shared request/response plumbing for the Agora services: page-number
//! pagination, case-insensitive search terms, validation error shaping and
//! tracing subscriber setup.

pub mod pagination;
pub mod search;
pub mod telemetry;
pub mod validation;

pub use pagination::{PageQuery, PageRequest, PagedResponse, PaginationError};
pub use search::SearchTerm;
pub use validation::FieldErrors;
