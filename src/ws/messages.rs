//! WebSocket message types: envelope and commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DraftId;

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Client-provided ID for requests; server-generated for events.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

impl WsMessage {
    /// Builds a server-originated message stamped now.
    #[must_use]
    pub fn new(id: String, msg_type: WsMessageType, payload: serde_json::Value) -> Self {
        Self {
            id,
            msg_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Builds an error message answering request `id`.
    #[must_use]
    pub fn error(id: String, code: u32, message: &str) -> Self {
        Self::new(
            id,
            WsMessageType::Error,
            serde_json::json!({ "code": code, "message": message }),
        )
    }

    /// Serializes the message to JSON text.
    #[must_use]
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Client → Server command.
    Command,
    /// Server → Client response to a command.
    Response,
    /// Server → Client draft event.
    Event,
    /// Server → Client error.
    Error,
}

/// Commands that a client can send over WebSocket, carried in the
/// envelope's `payload`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Follow drafts. With `since_version`, events after it are replayed
    /// before live delivery starts.
    Subscribe {
        /// Drafts to follow.
        draft_ids: Vec<DraftId>,
        /// Last version the client already has.
        #[serde(default)]
        since_version: Option<i64>,
    },
    /// Stop following drafts.
    Unsubscribe {
        /// Drafts to drop.
        draft_ids: Vec<DraftId>,
    },
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_command_parses_with_optional_version() {
        let id = DraftId::new();
        let payload = serde_json::json!({
            "command": "subscribe",
            "draft_ids": [id],
            "since_version": 3,
        });
        let Ok(cmd) = serde_json::from_value::<WsCommand>(payload) else {
            panic!("subscribe should parse");
        };
        assert_eq!(
            cmd,
            WsCommand::Subscribe {
                draft_ids: vec![id],
                since_version: Some(3),
            }
        );
    }

    #[test]
    fn unknown_command_is_rejected() {
        let payload = serde_json::json!({ "command": "pause", "draft_ids": [] });
        assert!(serde_json::from_value::<WsCommand>(payload).is_err());
    }
}
