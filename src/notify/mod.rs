use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;

pub mod events;
pub mod pubsub;

struct Waiter {
    token: u64,
    tx: UnboundedSender<String>,
}

/// Per-instance table of waiting users and their open streams.
///
/// Each user holds at most one channel; registering again replaces the
/// previous stream. Registrations carry a token so a superseded stream's
/// cleanup cannot release its replacement.
#[derive(Default, Clone)]
pub struct WaiterRegistry {
    inner: Arc<RwLock<HashMap<String, Waiter>>>,
    next_token: Arc<AtomicU64>,
}

impl WaiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter's stream; returns the registration token and the
    /// receiving end the stream drains.
    pub async fn register(&self, user_id: &str) -> (u64, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.inner.write().await;
        guard.insert(user_id.to_string(), Waiter { token, tx });
        (token, rx)
    }

    /// Forward a bus payload to the user's stream. Returns `false` when no
    /// waiter is registered (late publish after cleanup; dropped).
    pub async fn deliver(&self, user_id: &str, payload: String) -> bool {
        let guard = self.inner.read().await;
        match guard.get(user_id) {
            Some(waiter) => waiter.tx.send(payload).is_ok(),
            None => false,
        }
    }

    /// Drop the registration if it still belongs to `token`. Returns whether
    /// this call removed it.
    pub async fn release(&self, user_id: &str, token: u64) -> bool {
        let mut guard = self.inner.write().await;
        match guard.get(user_id) {
            Some(waiter) if waiter.token == token => {
                guard.remove(user_id);
                true
            }
            _ => false,
        }
    }

    /// Number of waiters currently held by this instance.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_to_registered_waiter() {
        let registry = WaiterRegistry::new();
        let (_token, mut rx) = registry.register("alice").await;

        assert!(registry.deliver("alice", "payload".into()).await);
        assert_eq!(rx.recv().await.unwrap(), "payload");

        assert!(!registry.deliver("bob", "payload".into()).await);
    }

    #[tokio::test]
    async fn release_is_token_scoped() {
        let registry = WaiterRegistry::new();
        let (stale_token, _stale_rx) = registry.register("alice").await;
        let (live_token, mut live_rx) = registry.register("alice").await;

        // The replaced stream's cleanup must not tear down the new one.
        assert!(!registry.release("alice", stale_token).await);
        assert!(registry.deliver("alice", "still here".into()).await);
        assert_eq!(live_rx.recv().await.unwrap(), "still here");

        assert!(registry.release("alice", live_token).await);
        assert!(!registry.deliver("alice", "gone".into()).await);
    }
}
