use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

lazy_static! {
    /// Follow edges created or removed (no-ops are not counted).
    pub static ref FOLLOW_EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "social_follow_events_total",
        "Follow graph mutations segmented by action",
        &["action"]
    )
    .expect("failed to register social_follow_events_total");

    /// Like requests by outcome (created, already_liked, removed, not_liked).
    pub static ref LIKE_EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "social_like_events_total",
        "Like and unlike requests segmented by outcome",
        &["outcome"]
    )
    .expect("failed to register social_like_events_total");

    /// Notifications written, by target kind.
    pub static ref NOTIFICATIONS_CREATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "social_notifications_created_total",
        "Notifications created segmented by target kind",
        &["target"]
    )
    .expect("failed to register social_notifications_created_total");
}
