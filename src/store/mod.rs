use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::session::SessionRecord;

pub mod redis;

pub use self::redis::RedisMatchStore;

/// Narrow interface over the shared durable store.
///
/// Methods correspond to the operation groups the match path needs; groups
/// that touch several keys are single calls so a backend can pipeline them.
/// Nothing here is transactional across keys: correctness rests on the
/// atomic random pop plus idempotent cleanup and read-side repair.
#[async_trait]
pub trait MatchStore: Send + Sync {
    // --- interest queues ---

    /// Atomically remove and return a random waiter from a tag's queue.
    async fn pop_waiter(&self, tag: &str) -> AppResult<Option<String>>;

    /// Put a user (back) into a tag's queue.
    async fn push_waiter(&self, tag: &str, user_id: &str) -> AppResult<()>;

    /// Enroll a user into every given queue and record the membership set.
    async fn enqueue_user(&self, user_id: &str, tags: &[String]) -> AppResult<()>;

    /// Tags a user is currently enqueued under (empty when not queued).
    async fn queued_interests(&self, user_id: &str) -> AppResult<Vec<String>>;

    /// Remove a user from each listed queue and drop their membership set.
    async fn clear_user_queues(&self, user_id: &str, tags: &[String]) -> AppResult<()>;

    /// Drop only the membership set (wildcard partner cleanup).
    async fn delete_queued_interests(&self, user_id: &str) -> AppResult<()>;

    // --- popularity / known interests ---

    /// Record one enrollment per tag at the given millisecond timestamp and
    /// remember the tags in the all-interests set.
    async fn record_enrollment(&self, user_id: &str, tags: &[String], at_ms: i64)
        -> AppResult<()>;

    /// Every tag ever observed (order unspecified).
    async fn known_interests(&self) -> AppResult<Vec<String>>;

    /// Trim each popularity set below the cutoff and return the remaining
    /// cardinality per tag.
    async fn popularity_counts(&self, cutoff_ms: i64) -> AppResult<Vec<(String, u64)>>;

    // --- sessions ---

    /// Persist a session record and both participant mappings.
    async fn put_session(&self, record: &SessionRecord) -> AppResult<()>;

    /// Chat id of the user's active session, if any.
    async fn session_for_user(&self, user_id: &str) -> AppResult<Option<String>>;

    /// Raw stored session record for a chat id.
    async fn load_session(&self, chat_id: &str) -> AppResult<Option<String>>;

    /// Delete a session record and every participant's mapping.
    async fn delete_session(&self, chat_id: &str, participants: &[String]) -> AppResult<()>;

    /// Delete a single user's session mapping (read-side repair).
    async fn delete_user_session(&self, user_id: &str) -> AppResult<()>;

    // --- notification bus / operational ---

    /// Publish a match payload to the user's notification channel.
    async fn publish_match(&self, user_id: &str, payload: &str) -> AppResult<()>;

    /// Count keys matching a pattern (status reporting).
    async fn count_keys(&self, pattern: &str) -> AppResult<u64>;

    /// Liveness check against the store.
    async fn ping(&self) -> AppResult<()>;
}
