use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, Result};

pub mod accounts;
pub mod comments;
pub mod engagement;
pub mod feed;
pub mod graph;
pub mod notifications;
pub mod posts;

pub use accounts::AccountService;
pub use comments::CommentService;
pub use engagement::{EngagementLedger, LikeOutcome, UnlikeOutcome};
pub use feed::FeedService;
pub use graph::{FollowSnapshot, SocialGraph};
pub use notifications::NotificationService;
pub use posts::PostService;

/// Decode a request body. Callers check permissions first, so an
/// unauthorized request is refused whatever its body looks like.
pub(crate) fn decode_body<T: DeserializeOwned>(body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| AppError::BadRequest(format!("JSON parse error - {e}")))
}
