use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// A chat session: the two participants and the chat server hosting them.
///
/// The stored form is `{serverUrl, participants}` under `chat_session:<chatId>`;
/// the chat id itself is the key, so it is not repeated in the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub chat_id: String,
    pub server_url: String,
    pub participants: Vec<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    server_url: String,
    participants: Vec<String>,
}

impl SessionRecord {
    pub fn new(server_url: impl Into<String>, a: &str, b: &str) -> Self {
        Self {
            chat_id: chat_id_for(a, b),
            server_url: server_url.into(),
            participants: vec![a.to_string(), b.to_string()],
        }
    }

    pub fn to_stored(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&StoredSession {
            server_url: self.server_url.clone(),
            participants: self.participants.clone(),
        })
    }

    pub fn from_stored(chat_id: &str, raw: &str) -> Result<Self, serde_json::Error> {
        let stored: StoredSession = serde_json::from_str(raw)?;
        Ok(Self {
            chat_id: chat_id.to_string(),
            server_url: stored.server_url,
            participants: stored.participants,
        })
    }
}

/// Deterministic chat id: SHA-1 hex of the two ids sorted lexicographically
/// and joined by `'-'`.
pub fn chat_id_for(a: &str, b: &str) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Sha1::new();
    hasher.update(format!("{lo}-{hi}").as_bytes());
    hex::encode(hasher.finalize())
}
