/// Chat entities shared by the session client and the web front-end.
/// Messages live only in memory for the lifetime of one mounted session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Agent label used for backend responses that carry no agent name.
pub const DEFAULT_AGENT: &str = "Master Agent";

/// Agent label attached to upload analysis messages.
pub const DOCUMENT_AGENT: &str = "Document Agent";

pub const WELCOME_TEXT: &str = "Welcome to CuraVyom AI. I am the Master Agent. \
How can I assist with your drug repurposing research today?";

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Message identifier: a session-local sequence number, or whatever the
/// backend supplied (numbers are kept in their decimal text form).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Local(u64),
    Server(String),
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Local(n) => write!(f, "{n}"),
            MessageId::Server(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Chat message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub text: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub is_upload: bool,
}

impl ChatMessage {
    fn base(id: MessageId, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id,
            sender,
            agent: None,
            text: text.into(),
            timestamp: display_time(),
            workflow: None,
            metadata: None,
            is_upload: false,
        }
    }

    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self::base(id, Sender::User, text)
    }

    pub fn system(id: MessageId, text: impl Into<String>) -> Self {
        Self::base(id, Sender::System, text)
    }

    pub fn agent(id: MessageId, agent: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            agent: Some(agent.into()),
            ..Self::base(id, Sender::Agent, text)
        }
    }

    /// Optimistic entry shown while a file upload is in flight.
    pub fn upload_placeholder(id: MessageId, file_name: &str) -> Self {
        Self {
            is_upload: true,
            ..Self::base(id, Sender::User, format!("Uploading {file_name}..."))
        }
    }

    /// The system greeting every session starts with.
    pub fn welcome() -> Self {
        Self::system(MessageId::Local(1), WELCOME_TEXT)
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }
}

/// Wall-clock time as shown next to chat bubbles (`HH:MM`, local time).
pub fn display_time() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}
