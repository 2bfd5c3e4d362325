//! Chat events and the downstream WebSocket frame schema.
//!
//! `ChatEvent` is what an upstream feed yields. `ServerFrame` is what a
//! viewer receives; `ClientFrame` is what a viewer may send back.

use serde::{Deserialize, Serialize};

/// A single chat message observed on a live broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Display name of the author.
    pub nickname: String,
    /// Message text.
    pub comment: String,
}

impl ChatEvent {
    pub fn new(nickname: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            comment: comment.into(),
        }
    }

    /// Relay text shown to viewers: `"<nickname>: <comment>"`.
    pub fn relay_text(&self) -> String {
        format!("{}: {}", self.nickname, self.comment)
    }
}

/// Server → viewer frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// First frame on every connection. Clients echo `sessionId` in bind
    /// requests.
    Session {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    /// A relayed chat line.
    Chat { message: String },
    /// Keepalive reply.
    Pong,
    /// Request-scoped failure; the connection may be closed afterwards.
    Error { code: String, message: String },
}

impl ServerFrame {
    pub fn chat(event: &ChatEvent) -> Self {
        Self::Chat {
            message: event.relay_text(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Viewer → server frames. Anything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Ping,
}
