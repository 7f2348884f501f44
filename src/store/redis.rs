use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisResult};

use crate::error::AppResult;
use crate::keys;
use crate::models::session::SessionRecord;
use crate::store::MatchStore;

/// Redis-backed [`MatchStore`].
///
/// Holds a multiplexed connection manager; the manager is cheap to clone and
/// every operation works on its own clone. Pub/sub subscriptions need a
/// dedicated connection and live in `notify::pubsub`, not here.
#[derive(Clone)]
pub struct RedisMatchStore {
    manager: ConnectionManager,
}

impl RedisMatchStore {
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    pub async fn connect(url: &str) -> RedisResult<Self> {
        let client = Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }

    fn conn(&self) -> ConnectionManager {
        self.manager.clone()
    }

    async fn scan_keys(&self, pattern: &str) -> AppResult<Vec<String>> {
        let mut conn = self.conn();
        let mut cursor: u64 = 0;
        let mut found = Vec::new();
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;
            found.extend(keys);
            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }
        Ok(found)
    }
}

#[async_trait]
impl MatchStore for RedisMatchStore {
    async fn pop_waiter(&self, tag: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn();
        let popped: Option<String> = conn.spop(keys::interest_queue(tag)).await?;
        Ok(popped)
    }

    async fn push_waiter(&self, tag: &str, user_id: &str) -> AppResult<()> {
        let mut conn = self.conn();
        let _: () = conn.sadd(keys::interest_queue(tag), user_id).await?;
        Ok(())
    }

    async fn enqueue_user(&self, user_id: &str, tags: &[String]) -> AppResult<()> {
        let mut conn = self.conn();
        let mut pipe = redis::pipe();
        for tag in tags {
            pipe.sadd(keys::interest_queue(tag), user_id).ignore();
            pipe.sadd(keys::ALL_INTERESTS, tag).ignore();
            pipe.sadd(keys::user_interests(user_id), tag).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn queued_interests(&self, user_id: &str) -> AppResult<Vec<String>> {
        let mut conn = self.conn();
        let tags: Vec<String> = conn.smembers(keys::user_interests(user_id)).await?;
        Ok(tags)
    }

    async fn clear_user_queues(&self, user_id: &str, tags: &[String]) -> AppResult<()> {
        let mut conn = self.conn();
        let mut pipe = redis::pipe();
        for tag in tags {
            pipe.srem(keys::interest_queue(tag), user_id).ignore();
        }
        pipe.del(keys::user_interests(user_id)).ignore();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete_queued_interests(&self, user_id: &str) -> AppResult<()> {
        let mut conn = self.conn();
        let _: () = conn.del(keys::user_interests(user_id)).await?;
        Ok(())
    }

    async fn record_enrollment(
        &self,
        user_id: &str,
        tags: &[String],
        at_ms: i64,
    ) -> AppResult<()> {
        let mut conn = self.conn();
        let mut pipe = redis::pipe();
        for tag in tags {
            pipe.zadd(keys::popular(tag), user_id, at_ms).ignore();
            pipe.sadd(keys::ALL_INTERESTS, tag).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn known_interests(&self) -> AppResult<Vec<String>> {
        let mut conn = self.conn();
        let tags: Vec<String> = conn.smembers(keys::ALL_INTERESTS).await?;
        Ok(tags)
    }

    async fn popularity_counts(&self, cutoff_ms: i64) -> AppResult<Vec<(String, u64)>> {
        let popular_keys = self.scan_keys(&keys::popular_pattern()).await?;
        let mut conn = self.conn();
        let mut counts = Vec::with_capacity(popular_keys.len());
        for key in popular_keys {
            let Some(tag) = keys::tag_from_popular(&key).map(str::to_string) else {
                continue;
            };
            // Trim expired enrollments and read what is left in one round trip.
            let (_, count): (u64, u64) = redis::pipe()
                .zrembyscore(&key, "-inf", format!("({}", cutoff_ms))
                .zcard(&key)
                .query_async(&mut conn)
                .await?;
            counts.push((tag, count));
        }
        Ok(counts)
    }

    async fn put_session(&self, record: &SessionRecord) -> AppResult<()> {
        let raw = record.to_stored()?;
        let mut conn = self.conn();
        let mut pipe = redis::pipe();
        pipe.set(keys::chat_session(&record.chat_id), raw).ignore();
        for participant in &record.participants {
            pipe.set(keys::user_session(participant), &record.chat_id)
                .ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn session_for_user(&self, user_id: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn();
        let chat_id: Option<String> = conn.get(keys::user_session(user_id)).await?;
        Ok(chat_id)
    }

    async fn load_session(&self, chat_id: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn();
        let raw: Option<String> = conn.get(keys::chat_session(chat_id)).await?;
        Ok(raw)
    }

    async fn delete_session(&self, chat_id: &str, participants: &[String]) -> AppResult<()> {
        let mut conn = self.conn();
        let mut pipe = redis::pipe();
        pipe.del(keys::chat_session(chat_id)).ignore();
        for participant in participants {
            pipe.del(keys::user_session(participant)).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete_user_session(&self, user_id: &str) -> AppResult<()> {
        let mut conn = self.conn();
        let _: () = conn.del(keys::user_session(user_id)).await?;
        Ok(())
    }

    async fn publish_match(&self, user_id: &str, payload: &str) -> AppResult<()> {
        let mut conn = self.conn();
        let _: () = conn.publish(keys::match_channel(user_id), payload).await?;
        Ok(())
    }

    async fn count_keys(&self, pattern: &str) -> AppResult<u64> {
        Ok(self.scan_keys(pattern).await?.len() as u64)
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
