//! Durable-store key schema
//!
//! All key construction goes through these builders so the layout stays
//! wire-identical across instances.

/// Reserved tag for users searching without any interest.
pub const WILDCARD_ANY: &str = "WILDCARD_ANY";

/// Set of all tags ever observed, scanned by the wildcard path.
pub const ALL_INTERESTS: &str = "all_interests";

const MATCH_CHANNEL_PREFIX: &str = "match_notification:";

/// Queue of users waiting on a tag (the wildcard queue is `interest:WILDCARD_ANY`).
pub fn interest_queue(tag: &str) -> String {
    format!("interest:{}", tag)
}

/// Set of tags a user is currently enqueued under.
pub fn user_interests(user_id: &str) -> String {
    format!("user_interests:{}", user_id)
}

/// Sorted set of enrollments for a tag, scored by millisecond timestamp.
pub fn popular(tag: &str) -> String {
    format!("popular:{}", tag)
}

/// Pattern matching every popularity key.
pub fn popular_pattern() -> String {
    "popular:*".to_string()
}

/// Tag carried by a popularity key, if it is one.
pub fn tag_from_popular(key: &str) -> Option<&str> {
    key.strip_prefix("popular:")
}

/// JSON session record for a chat id.
pub fn chat_session(chat_id: &str) -> String {
    format!("chat_session:{}", chat_id)
}

/// Mapping from a user to the chat id of their active session.
pub fn user_session(user_id: &str) -> String {
    format!("user_session:{}", user_id)
}

/// Pub/sub topic a waiting user's instance listens on.
pub fn match_channel(user_id: &str) -> String {
    format!("{}{}", MATCH_CHANNEL_PREFIX, user_id)
}

/// Pattern the per-instance subscriber listens on.
pub fn match_channel_pattern() -> String {
    format!("{}*", MATCH_CHANNEL_PREFIX)
}

/// User id carried by a notification channel name, if it is one.
pub fn user_from_match_channel(channel: &str) -> Option<&str> {
    channel.strip_prefix(MATCH_CHANNEL_PREFIX)
}
