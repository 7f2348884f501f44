use std::sync::Arc;

use tracing::warn;

use crate::error::AppResult;
use crate::models::session::SessionRecord;
use crate::store::MatchStore;

/// Durable session lifecycle: create on pair formation, look up on
/// reconnection, end on disconnect or supersede.
///
/// Writes are pipelined, not transactional; the read path repairs dangling
/// user mappings it encounters.
pub struct SessionManager {
    store: Arc<dyn MatchStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, record: &SessionRecord) -> AppResult<()> {
        self.store.put_session(record).await
    }

    /// The user's active session, repairing a mapping whose record is gone
    /// or unreadable.
    pub async fn get_session_for_user(&self, user_id: &str) -> AppResult<Option<SessionRecord>> {
        let Some(chat_id) = self.store.session_for_user(user_id).await? else {
            return Ok(None);
        };

        match self.store.load_session(&chat_id).await? {
            Some(raw) => match SessionRecord::from_stored(&chat_id, &raw) {
                Ok(record) => Ok(Some(record)),
                Err(err) => {
                    warn!(user_id, chat_id = %chat_id, error = %err, "unreadable session record, repairing mapping");
                    self.store.delete_user_session(user_id).await?;
                    Ok(None)
                }
            },
            None => {
                warn!(user_id, chat_id = %chat_id, "dangling session mapping, repairing");
                self.store.delete_user_session(user_id).await?;
                Ok(None)
            }
        }
    }

    /// End the user's session, cleaning up every participant's mapping.
    /// Returns `false` when the user has no session. An unreadable record
    /// only clears the caller's own mapping.
    pub async fn end(&self, user_id: &str) -> AppResult<bool> {
        let Some(chat_id) = self.store.session_for_user(user_id).await? else {
            return Ok(false);
        };

        let record = match self.store.load_session(&chat_id).await? {
            Some(raw) => SessionRecord::from_stored(&chat_id, &raw).ok(),
            None => None,
        };

        match record {
            Some(record) => {
                self.store
                    .delete_session(&chat_id, &record.participants)
                    .await?;
                Ok(true)
            }
            None => {
                warn!(user_id, chat_id = %chat_id, "session record missing or unreadable on end");
                self.store.delete_user_session(user_id).await?;
                Ok(false)
            }
        }
    }
}
