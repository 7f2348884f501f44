use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct ChatServerEntry {
    url: String,
}

struct CachedServers {
    urls: Vec<String>,
    last_refresh: Option<Instant>,
}

/// Round-robin selector over the chat servers known to the discovery source.
///
/// The URL list is cached per process and refreshed when empty or older than
/// a minute; concurrent `next` calls hand out non-overlapping indices via an
/// atomic cursor.
pub struct ChatServerSelector {
    http: reqwest::Client,
    discovery_url: String,
    cache: Mutex<CachedServers>,
    cursor: AtomicUsize,
}

impl ChatServerSelector {
    pub fn new(discovery_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            discovery_url: discovery_url.into(),
            cache: Mutex::new(CachedServers {
                urls: Vec::new(),
                last_refresh: None,
            }),
            cursor: AtomicUsize::new(0),
        }
    }

    /// A selector with a fixed server list that never dials discovery.
    pub fn preloaded(urls: Vec<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            discovery_url: String::new(),
            cache: Mutex::new(CachedServers {
                urls,
                last_refresh: Some(Instant::now()),
            }),
            cursor: AtomicUsize::new(0),
        }
    }

    async fn fetch_servers(&self) -> AppResult<Vec<String>> {
        let endpoint = format!("{}/servers", self.discovery_url.trim_end_matches('/'));
        let entries: Vec<ChatServerEntry> = self
            .http
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| AppError::Discovery(format!("discovery request failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Discovery(format!("discovery returned error: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::Discovery(format!("discovery payload unreadable: {e}")))?;

        Ok(entries.into_iter().map(|entry| entry.url).collect())
    }

    /// Next chat-server URL in rotation, refreshing the cached list when it
    /// is empty or stale.
    pub async fn next(&self) -> AppResult<String> {
        let mut cache = self.cache.lock().await;

        let stale = match cache.last_refresh {
            Some(at) => at.elapsed() > REFRESH_INTERVAL,
            None => true,
        };
        if cache.urls.is_empty() || stale {
            if self.discovery_url.is_empty() {
                if cache.urls.is_empty() {
                    return Err(AppError::Discovery("no chat servers configured".into()));
                }
            } else {
                match self.fetch_servers().await {
                    Ok(urls) => {
                        debug!(count = urls.len(), "refreshed chat server list");
                        cache.urls = urls;
                        cache.last_refresh = Some(Instant::now());
                    }
                    Err(err) if !cache.urls.is_empty() => {
                        // Keep serving the stale list; the next call retries.
                        warn!(error = %err, "chat server refresh failed, reusing cached list");
                        cache.last_refresh = Some(Instant::now());
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        if cache.urls.is_empty() {
            return Err(AppError::Discovery("discovery returned no chat servers".into()));
        }

        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % cache.urls.len();
        Ok(cache.urls[index].clone())
    }
}
