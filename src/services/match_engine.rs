use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::keys::WILDCARD_ANY;
use crate::models::interest;
use crate::models::session::SessionRecord;
use crate::notify::events::MatchEvent;
use crate::services::server_selector::ChatServerSelector;
use crate::services::session_manager::SessionManager;
use crate::store::MatchStore;

/// How long an enrollment counts toward a tag's popularity.
const POPULARITY_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Result of a successful pairing, from the caller's perspective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub partner_user_id: String,
    pub common_interests: Vec<String>,
    pub chat_id: String,
    pub chat_server_url: String,
}

/// Outcome of `find_or_queue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched(MatchResult),
    Waiting,
}

/// The find-or-enqueue core.
///
/// Concurrency safety across instances comes from the store's atomic random
/// pop; the engine itself holds no locks across its await points.
pub struct MatchEngine {
    store: Arc<dyn MatchStore>,
    sessions: Arc<SessionManager>,
    selector: Arc<ChatServerSelector>,
    deny_list: Vec<String>,
}

impl MatchEngine {
    pub fn new(
        store: Arc<dyn MatchStore>,
        sessions: Arc<SessionManager>,
        selector: Arc<ChatServerSelector>,
        deny_list: Vec<String>,
    ) -> Self {
        Self {
            store,
            sessions,
            selector,
            deny_list,
        }
    }

    /// Pair the caller with a waiting user sharing an interest, or enroll
    /// them into the relevant queues.
    ///
    /// Any prior session of the caller is ended first; a `Matched` outcome
    /// means the pair's session is durably created and the waiter's channel
    /// has been notified.
    pub async fn find_or_queue(
        &self,
        user_id: &str,
        raw_interests: &[String],
    ) -> AppResult<MatchOutcome> {
        if user_id.trim().is_empty() {
            return Err(AppError::InvalidInput("userId must not be empty".into()));
        }

        let tags = interest::normalize(raw_interests);

        if self.sessions.end(user_id).await? {
            debug!(user_id, "ended prior session before new search");
        }

        if tags.is_empty() {
            return self.wildcard_search(user_id).await;
        }

        self.store
            .record_enrollment(user_id, &tags, Utc::now().timestamp_millis())
            .await?;

        // Shuffle so later tags are not systematically starved.
        let mut scan_order = tags.clone();
        {
            let mut rng = rand::thread_rng();
            scan_order.shuffle(&mut rng);
        }

        for tag in &scan_order {
            if let Some((partner, common)) = self.try_interest_queue(user_id, tag, &tags).await? {
                let result = self.form_pair(user_id, &partner, common).await?;
                return Ok(MatchOutcome::Matched(result));
            }
        }

        // No direct hit: a wildcard waiter takes anyone.
        if let Some(partner) = self.pop_non_self(WILDCARD_ANY, user_id).await? {
            self.store.delete_queued_interests(&partner).await?;
            let result = self.form_pair(user_id, &partner, tags.clone()).await?;
            return Ok(MatchOutcome::Matched(result));
        }

        self.store.enqueue_user(user_id, &tags).await?;
        debug!(user_id, tags = ?tags, "no partner available, enqueued");
        Ok(MatchOutcome::Waiting)
    }

    /// Wildcard path: callers without interests take the first waiter from
    /// the wildcard queue, then from any known interest queue.
    async fn wildcard_search(&self, user_id: &str) -> AppResult<MatchOutcome> {
        if let Some(partner) = self.pop_non_self(WILDCARD_ANY, user_id).await? {
            self.store.delete_queued_interests(&partner).await?;
            let result = self.form_pair(user_id, &partner, Vec::new()).await?;
            return Ok(MatchOutcome::Matched(result));
        }

        for tag in self.store.known_interests().await? {
            if tag == WILDCARD_ANY {
                continue;
            }
            if let Some(partner) = self.pop_non_self(&tag, user_id).await? {
                let partner_tags = self.store.queued_interests(&partner).await?;
                self.store.clear_user_queues(&partner, &partner_tags).await?;
                let result = self.form_pair(user_id, &partner, vec![tag]).await?;
                return Ok(MatchOutcome::Matched(result));
            }
        }

        self.store
            .enqueue_user(user_id, &[WILDCARD_ANY.to_string()])
            .await?;
        debug!(user_id, "no waiter anywhere, enqueued as wildcard");
        Ok(MatchOutcome::Waiting)
    }

    /// Pop a candidate from one interest queue and validate the pairing.
    /// Returns the partner and the common interest set, or `None` to keep
    /// scanning.
    async fn try_interest_queue(
        &self,
        user_id: &str,
        tag: &str,
        caller_tags: &[String],
    ) -> AppResult<Option<(String, Vec<String>)>> {
        let Some(candidate) = self.pop_non_self(tag, user_id).await? else {
            return Ok(None);
        };

        let candidate_tags = self.store.queued_interests(&candidate).await?;
        let common = interest::common(caller_tags, &candidate_tags);
        if common.is_empty() {
            // Membership record gone or disagreeing (race with a cancel):
            // put the candidate back and keep scanning.
            warn!(tag, candidate = %candidate, "popped waiter without matching interests, reinserting");
            self.store.push_waiter(tag, &candidate).await?;
            return Ok(None);
        }

        self.store
            .clear_user_queues(&candidate, &candidate_tags)
            .await?;
        Ok(Some((candidate, common)))
    }

    /// Atomic random pop that never hands the caller back to itself; a
    /// self-pop (left over from an unclean shutdown) is reinserted.
    async fn pop_non_self(&self, tag: &str, user_id: &str) -> AppResult<Option<String>> {
        match self.store.pop_waiter(tag).await? {
            Some(popped) if popped == user_id => {
                self.store.push_waiter(tag, user_id).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Mint the session, persist it, and notify the waiter's channel.
    async fn form_pair(
        &self,
        caller: &str,
        partner: &str,
        common: Vec<String>,
    ) -> AppResult<MatchResult> {
        let server_url = self.selector.next().await?;
        let record = SessionRecord::new(server_url, caller, partner);
        self.sessions.create(&record).await?;

        info!(
            caller,
            partner,
            chat_id = %record.chat_id,
            common = ?common,
            "matched pair"
        );

        // Fire-and-forget: a lost publish is recovered through the durable
        // session record on the waiter's next reconnect.
        let event = MatchEvent::matched(caller, &common, &record.chat_id, &record.server_url);
        match serde_json::to_string(&event) {
            Ok(payload) => {
                if let Err(err) = self.store.publish_match(partner, &payload).await {
                    warn!(partner, error = %err, "match publish failed");
                }
            }
            Err(err) => warn!(partner, error = %err, "match payload serialization failed"),
        }

        Ok(MatchResult {
            partner_user_id: partner.to_string(),
            common_interests: common,
            chat_id: record.chat_id,
            chat_server_url: record.server_url,
        })
    }

    /// Withdraw the user from every queue they are enrolled in. No-op when
    /// the user is not queued, so repeated cleanup is safe.
    pub async fn cancel(&self, user_id: &str) -> AppResult<()> {
        let tags = self.store.queued_interests(user_id).await?;
        if tags.is_empty() {
            return Ok(());
        }
        self.store.clear_user_queues(user_id, &tags).await?;
        debug!(user_id, "search cancelled");
        Ok(())
    }

    /// Top `top_n` interests by enrollments inside the sliding window,
    /// after deny-list filtering. The read trims expired entries as it goes.
    pub async fn popular_interests(&self, top_n: usize) -> AppResult<Vec<(String, u64)>> {
        let cutoff = Utc::now().timestamp_millis() - POPULARITY_WINDOW.as_millis() as i64;
        let mut counts: Vec<(String, u64)> = self
            .store
            .popularity_counts(cutoff)
            .await?
            .into_iter()
            .filter(|(tag, _)| !self.deny_list.contains(tag))
            .collect();

        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts.truncate(top_n);
        Ok(counts)
    }
}
