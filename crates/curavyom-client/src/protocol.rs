//! Wire format of the Agent Core chat stream.
//!
//! Inbound frames are JSON objects tagged by `type`:
//!   `{"type":"log","content":"..."}`
//!   `{"type":"response","data":{"text":"...", ...}}`
//! Everything else decodes to [`InboundMessage::Unknown`] and is ignored.
//! Outbound frames are the user's raw text, not JSON.

use curavyom_common::entities::{ChatMessage, MessageId, DEFAULT_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload of a `response` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ResponseData {
    /// Server-supplied id, if it is a usable scalar.
    pub fn server_id(&self) -> Option<MessageId> {
        match self.id.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(MessageId::Server(s.clone())),
            Value::Number(n) => Some(MessageId::Server(n.to_string())),
            _ => None,
        }
    }

    /// Build the agent message this response appends. `fallback_id` is used
    /// when the server sent no id.
    pub fn into_message(self, fallback_id: MessageId) -> ChatMessage {
        let id = self.server_id().unwrap_or(fallback_id);
        let agent = self
            .agent
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_AGENT.to_string());
        let mut message = ChatMessage::agent(id, agent, self.text);
        if let Some(ts) = self.timestamp.filter(|t| !t.is_empty()) {
            message.timestamp = ts;
        }
        message.workflow = self.workflow;
        message.metadata = self.metadata;
        message
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Log { content: String },
    Response(ResponseData),
    /// Unrecognised tag, malformed JSON, or a non-text frame. Holds the raw
    /// frame (possibly truncated) for logging.
    Unknown { raw: String },
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Tagged {
    Log { content: String },
    Response { data: ResponseData },
}

const RAW_PREVIEW_LEN: usize = 256;

/// Decode one text frame. Never fails: anything unexpected is `Unknown`.
pub fn decode(frame: &str) -> InboundMessage {
    match serde_json::from_str::<Tagged>(frame) {
        Ok(Tagged::Log { content }) => InboundMessage::Log { content },
        Ok(Tagged::Response { data }) => InboundMessage::Response(data),
        Err(_) => InboundMessage::Unknown { raw: preview(frame) },
    }
}

fn preview(frame: &str) -> String {
    match frame.char_indices().nth(RAW_PREVIEW_LEN) {
        Some((idx, _)) => format!("{}…", &frame[..idx]),
        None => frame.to_string(),
    }
}
