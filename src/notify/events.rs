//! Matchmaking stream events.
//!
//! Every frame pushed to a client is one of these, serialized as
//! `{"state": ...}` JSON. The `MATCHED` envelope is also what travels over
//! the notification bus, so the waiter's instance forwards it verbatim.

use serde::{Deserialize, Serialize};

use crate::models::interest;
use crate::services::match_engine::MatchResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state")]
pub enum MatchEvent {
    #[serde(rename = "WAITING")]
    Waiting,

    #[serde(rename = "MATCHED")]
    Matched {
        #[serde(rename = "matchedUserId")]
        matched_user_id: String,
        /// Comma-separated common interests; empty for pure wildcard pairs.
        interest: String,
        #[serde(rename = "chatId")]
        chat_id: String,
        #[serde(rename = "chatServerUrl")]
        chat_server_url: String,
    },

    #[serde(rename = "MAINTENANCE")]
    Maintenance { message: String },

    #[serde(rename = "ERROR")]
    Error { message: String },
}

impl MatchEvent {
    /// The `MATCHED` envelope naming `partner` as the matched side.
    pub fn matched(partner: &str, common: &[String], chat_id: &str, server_url: &str) -> Self {
        Self::Matched {
            matched_user_id: partner.to_string(),
            interest: interest::to_csv(common),
            chat_id: chat_id.to_string(),
            chat_server_url: server_url.to_string(),
        }
    }

    /// A `MATCHED` frame from a synchronous engine result.
    pub fn from_result(result: &MatchResult) -> Self {
        Self::matched(
            &result.partner_user_id,
            &result.common_interests,
            &result.chat_id,
            &result.chat_server_url,
        )
    }
}
