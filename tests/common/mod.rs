//! Shared test support: an in-memory `MatchStore` double and engine fixtures.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use matchmaking_service::error::AppResult;
use matchmaking_service::models::session::SessionRecord;
use matchmaking_service::services::match_engine::MatchEngine;
use matchmaking_service::services::server_selector::ChatServerSelector;
use matchmaking_service::services::session_manager::SessionManager;
use matchmaking_service::store::MatchStore;

#[derive(Default)]
struct Inner {
    /// tag -> waiting user ids
    queues: HashMap<String, BTreeSet<String>>,
    /// user id -> tags they are enqueued under
    memberships: HashMap<String, BTreeSet<String>>,
    all_interests: BTreeSet<String>,
    /// tag -> user id -> enrollment timestamp (ms)
    popularity: HashMap<String, BTreeMap<String, i64>>,
    /// chat id -> raw stored record
    sessions: HashMap<String, String>,
    /// user id -> chat id
    user_sessions: HashMap<String, String>,
    /// (user id, payload) in publish order
    published: Vec<(String, String)>,
}

/// In-memory stand-in for the Redis store. Pops are deterministic (smallest
/// member first) so scenarios can be scripted precisely.
#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn queue_members(&self, tag: &str) -> Vec<String> {
        let guard = self.inner.lock().await;
        guard
            .queues
            .get(tag)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn membership(&self, user_id: &str) -> Vec<String> {
        let guard = self.inner.lock().await;
        guard
            .memberships
            .get(user_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn published(&self) -> Vec<(String, String)> {
        self.inner.lock().await.published.clone()
    }

    pub async fn session_raw(&self, chat_id: &str) -> Option<String> {
        self.inner.lock().await.sessions.get(chat_id).cloned()
    }

    pub async fn user_session(&self, user_id: &str) -> Option<String> {
        self.inner.lock().await.user_sessions.get(user_id).cloned()
    }

    /// Corrupt or pre-seed a raw session record (store-level fault injection).
    pub async fn insert_raw_session(&self, chat_id: &str, raw: &str) {
        self.inner
            .lock()
            .await
            .sessions
            .insert(chat_id.to_string(), raw.to_string());
    }

    pub async fn set_user_session(&self, user_id: &str, chat_id: &str) {
        self.inner
            .lock()
            .await
            .user_sessions
            .insert(user_id.to_string(), chat_id.to_string());
    }

    /// Delete a session record while leaving user mappings dangling.
    pub async fn remove_raw_session(&self, chat_id: &str) {
        self.inner.lock().await.sessions.remove(chat_id);
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn pop_waiter(&self, tag: &str) -> AppResult<Option<String>> {
        let mut guard = self.inner.lock().await;
        let (popped, emptied) = match guard.queues.get_mut(tag) {
            Some(queue) => {
                let popped = queue.iter().next().cloned();
                if let Some(user) = &popped {
                    queue.remove(user);
                }
                (popped, queue.is_empty())
            }
            None => return Ok(None),
        };
        if emptied {
            guard.queues.remove(tag);
        }
        Ok(popped)
    }

    async fn push_waiter(&self, tag: &str, user_id: &str) -> AppResult<()> {
        let mut guard = self.inner.lock().await;
        guard
            .queues
            .entry(tag.to_string())
            .or_default()
            .insert(user_id.to_string());
        Ok(())
    }

    async fn enqueue_user(&self, user_id: &str, tags: &[String]) -> AppResult<()> {
        let mut guard = self.inner.lock().await;
        for tag in tags {
            guard
                .queues
                .entry(tag.clone())
                .or_default()
                .insert(user_id.to_string());
            guard.all_interests.insert(tag.clone());
            guard
                .memberships
                .entry(user_id.to_string())
                .or_default()
                .insert(tag.clone());
        }
        Ok(())
    }

    async fn queued_interests(&self, user_id: &str) -> AppResult<Vec<String>> {
        let guard = self.inner.lock().await;
        Ok(guard
            .memberships
            .get(user_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear_user_queues(&self, user_id: &str, tags: &[String]) -> AppResult<()> {
        let mut guard = self.inner.lock().await;
        for tag in tags {
            let emptied = match guard.queues.get_mut(tag) {
                Some(queue) => {
                    queue.remove(user_id);
                    queue.is_empty()
                }
                None => false,
            };
            if emptied {
                guard.queues.remove(tag);
            }
        }
        guard.memberships.remove(user_id);
        Ok(())
    }

    async fn delete_queued_interests(&self, user_id: &str) -> AppResult<()> {
        self.inner.lock().await.memberships.remove(user_id);
        Ok(())
    }

    async fn record_enrollment(
        &self,
        user_id: &str,
        tags: &[String],
        at_ms: i64,
    ) -> AppResult<()> {
        let mut guard = self.inner.lock().await;
        for tag in tags {
            guard
                .popularity
                .entry(tag.clone())
                .or_default()
                .insert(user_id.to_string(), at_ms);
            guard.all_interests.insert(tag.clone());
        }
        Ok(())
    }

    async fn known_interests(&self) -> AppResult<Vec<String>> {
        let guard = self.inner.lock().await;
        Ok(guard.all_interests.iter().cloned().collect())
    }

    async fn popularity_counts(&self, cutoff_ms: i64) -> AppResult<Vec<(String, u64)>> {
        let mut guard = self.inner.lock().await;
        let mut counts = Vec::new();
        // Like the Redis path: trimming a set empty removes its key, so the
        // tag disappears from the listing entirely.
        guard.popularity.retain(|tag, entries| {
            entries.retain(|_, at| *at >= cutoff_ms);
            if entries.is_empty() {
                false
            } else {
                counts.push((tag.clone(), entries.len() as u64));
                true
            }
        });
        counts.sort();
        Ok(counts)
    }

    async fn put_session(&self, record: &SessionRecord) -> AppResult<()> {
        let raw = record.to_stored()?;
        let mut guard = self.inner.lock().await;
        guard.sessions.insert(record.chat_id.clone(), raw);
        for participant in &record.participants {
            guard
                .user_sessions
                .insert(participant.clone(), record.chat_id.clone());
        }
        Ok(())
    }

    async fn session_for_user(&self, user_id: &str) -> AppResult<Option<String>> {
        Ok(self.inner.lock().await.user_sessions.get(user_id).cloned())
    }

    async fn load_session(&self, chat_id: &str) -> AppResult<Option<String>> {
        Ok(self.inner.lock().await.sessions.get(chat_id).cloned())
    }

    async fn delete_session(&self, chat_id: &str, participants: &[String]) -> AppResult<()> {
        let mut guard = self.inner.lock().await;
        guard.sessions.remove(chat_id);
        for participant in participants {
            guard.user_sessions.remove(participant);
        }
        Ok(())
    }

    async fn delete_user_session(&self, user_id: &str) -> AppResult<()> {
        self.inner.lock().await.user_sessions.remove(user_id);
        Ok(())
    }

    async fn publish_match(&self, user_id: &str, payload: &str) -> AppResult<()> {
        self.inner
            .lock()
            .await
            .published
            .push((user_id.to_string(), payload.to_string()));
        Ok(())
    }

    async fn count_keys(&self, pattern: &str) -> AppResult<u64> {
        let guard = self.inner.lock().await;
        let count = match pattern {
            "chat_session:*" => guard.sessions.len(),
            "user_interests:*" => guard.memberships.len(),
            _ => 0,
        };
        Ok(count as u64)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[allow(dead_code)]
pub struct Fixture {
    pub store: MemoryStore,
    pub engine: MatchEngine,
    pub sessions: Arc<SessionManager>,
}

#[allow(dead_code)]
pub fn fixture() -> Fixture {
    fixture_with(&["http://chat-0.example"], &[])
}

#[allow(dead_code)]
pub fn fixture_with(server_urls: &[&str], deny_list: &[&str]) -> Fixture {
    let store = MemoryStore::new();
    let store_dyn: Arc<dyn MatchStore> = Arc::new(store.clone());
    let sessions = Arc::new(SessionManager::new(store_dyn.clone()));
    let selector = Arc::new(ChatServerSelector::preloaded(
        server_urls.iter().map(|url| url.to_string()).collect(),
    ));
    let engine = MatchEngine::new(
        store_dyn,
        sessions.clone(),
        selector,
        deny_list.iter().map(|tag| tag.to_string()).collect(),
    );
    Fixture {
        store,
        engine,
        sessions,
    }
}

#[allow(dead_code)]
pub fn tags(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}
