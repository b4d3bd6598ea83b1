//! In-memory state of one mounted chat session and the events it emits.
//!
//! Every mutation goes through a method here that pushes the matching
//! [`SessionEvent`]s, so the host view can mirror the state without polling.

use crate::protocol::ResponseData;
use curavyom_common::activity::{AgentActivity, AgentStatus, MASTER_ORCHESTRATOR};
use curavyom_common::entities::{ChatMessage, MessageId, DOCUMENT_AGENT};
use serde::Serialize;

pub const STATUS_READY: &str = "Ready";
pub const STATUS_CONNECTED: &str = "Connected to Agent Core";
pub const STATUS_PROCESSING: &str = "Processing...";
pub const STATUS_DISCONNECTED: &str = "Disconnected";
pub const STATUS_CONNECTION_ERROR: &str = "Connection Error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Open,
    /// Terminal. A session never reconnects.
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Status { status: String },
    Connection { state: ConnectionState },
    MessageAppended { message: ChatMessage },
    MessageUpdated { message: ChatMessage },
    Typing { typing: bool },
    Uploading { uploading: bool },
    Listening { listening: bool },
    Input { input: String },
    AgentActivity { agents: AgentActivity },
    Log { line: String },
    Response { data: ResponseData },
}

/// Result of a submit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input, nothing happened.
    Ignored,
    /// User message appended and handed to the writer.
    Sent,
    /// Connection was not open; status is `Connection Error`.
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub messages: Vec<ChatMessage>,
    pub status: String,
    pub connection: ConnectionState,
    pub typing: bool,
    pub uploading: bool,
    pub listening: bool,
    pub input: String,
    pub agents: AgentActivity,
    #[serde(skip)]
    next_id: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::welcome()],
            status: STATUS_READY.to_string(),
            connection: ConnectionState::Connecting,
            typing: false,
            uploading: false,
            listening: false,
            input: String::new(),
            agents: AgentActivity::roster(),
            next_id: 2,
        }
    }

    pub fn next_local_id(&mut self) -> MessageId {
        let id = self.next_id;
        self.next_id += 1;
        MessageId::Local(id)
    }

    pub fn is_open(&self) -> bool {
        self.connection == ConnectionState::Open
    }

    // ── Primitive setters ───────────────────────────────────────────────

    pub fn set_status(&mut self, status: impl Into<String>, events: &mut Vec<SessionEvent>) {
        self.status = status.into();
        events.push(SessionEvent::Status { status: self.status.clone() });
    }

    fn set_typing(&mut self, typing: bool, events: &mut Vec<SessionEvent>) {
        if self.typing != typing {
            self.typing = typing;
            events.push(SessionEvent::Typing { typing });
        }
    }

    fn set_uploading(&mut self, uploading: bool, events: &mut Vec<SessionEvent>) {
        if self.uploading != uploading {
            self.uploading = uploading;
            events.push(SessionEvent::Uploading { uploading });
        }
    }

    pub fn set_listening(&mut self, listening: bool, events: &mut Vec<SessionEvent>) {
        if self.listening != listening {
            self.listening = listening;
            events.push(SessionEvent::Listening { listening });
        }
    }

    pub fn set_input(&mut self, input: impl Into<String>, events: &mut Vec<SessionEvent>) {
        self.input = input.into();
        events.push(SessionEvent::Input { input: self.input.clone() });
    }

    /// Record a draft typed in the host view. Emits nothing: only transcripts
    /// and the post-submit clear push `Input` back to the view.
    pub fn edit_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    fn append(&mut self, message: ChatMessage, events: &mut Vec<SessionEvent>) {
        self.messages.push(message.clone());
        events.push(SessionEvent::MessageAppended { message });
    }

    /// Merge an activity update into the roster.
    pub fn apply_agent_activity(&mut self, update: AgentActivity, events: &mut Vec<SessionEvent>) {
        self.agents.merge(&update);
        events.push(SessionEvent::AgentActivity { agents: update });
    }

    // ── Connection lifecycle ────────────────────────────────────────────

    pub fn on_open(&mut self, events: &mut Vec<SessionEvent>) {
        if self.connection != ConnectionState::Connecting {
            return;
        }
        self.connection = ConnectionState::Open;
        events.push(SessionEvent::Connection { state: self.connection });
        self.set_status(STATUS_CONNECTED, events);
    }

    /// Close the session's connection. Idempotent.
    pub fn on_closed(&mut self, events: &mut Vec<SessionEvent>) {
        if self.connection == ConnectionState::Closed {
            return;
        }
        self.connection = ConnectionState::Closed;
        events.push(SessionEvent::Connection { state: self.connection });
        self.set_status(STATUS_DISCONNECTED, events);
    }

    // ── Inbound ─────────────────────────────────────────────────────────

    pub fn apply_log(&mut self, content: String, events: &mut Vec<SessionEvent>) {
        self.set_status(content.clone(), events);
        events.push(SessionEvent::Log { line: content });
    }

    /// Append the agent message for a response and mark the orchestrator
    /// active.
    pub fn apply_response(&mut self, data: ResponseData, events: &mut Vec<SessionEvent>) {
        let fallback = self.next_local_id();
        self.append(data.clone().into_message(fallback), events);
        self.set_typing(false, events);
        self.set_status(STATUS_READY, events);
        self.apply_agent_activity(
            AgentActivity::single(MASTER_ORCHESTRATOR, AgentStatus::Active),
            events,
        );
        events.push(SessionEvent::Response { data });
    }

    // ── Outbound ────────────────────────────────────────────────────────

    /// Apply the local effects of submitting `text`. The caller sends `text`
    /// upstream, unmodified, only on [`SubmitOutcome::Sent`].
    pub fn begin_submit(&mut self, text: &str, events: &mut Vec<SessionEvent>) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }
        if !self.is_open() {
            self.set_status(STATUS_CONNECTION_ERROR, events);
            self.set_typing(false, events);
            return SubmitOutcome::Rejected;
        }

        let id = self.next_local_id();
        self.append(ChatMessage::user(id, text), events);
        self.set_input("", events);
        self.set_typing(true, events);
        self.set_status(STATUS_PROCESSING, events);
        SubmitOutcome::Sent
    }

    // ── Upload ──────────────────────────────────────────────────────────

    /// Insert the placeholder for `file_name`. `None` if another upload is
    /// still outstanding.
    pub fn begin_upload(&mut self, file_name: &str, events: &mut Vec<SessionEvent>) -> Option<MessageId> {
        if self.uploading {
            return None;
        }
        self.set_uploading(true, events);
        let id = self.next_local_id();
        self.append(ChatMessage::upload_placeholder(id.clone(), file_name), events);
        Some(id)
    }

    /// Resolve the placeholder `id`. `Ok(analysis)` on success, `Err(())` on
    /// any failure.
    pub fn finish_upload(
        &mut self,
        id: &MessageId,
        file_name: &str,
        outcome: std::result::Result<Option<String>, ()>,
        events: &mut Vec<SessionEvent>,
    ) {
        let text = match &outcome {
            Ok(_) => format!("Uploaded: {file_name}"),
            Err(()) => format!("Failed to upload {file_name}"),
        };

        if let Some(placeholder) = self.messages.iter_mut().find(|m| m.is_upload && &m.id == id) {
            placeholder.text = text;
            events.push(SessionEvent::MessageUpdated { message: placeholder.clone() });
        }

        if let Ok(analysis) = outcome {
            let text = analysis.filter(|a| !a.trim().is_empty()).unwrap_or_else(|| {
                format!("Analyzed {file_name}. Ready to incorporate findings into the knowledge graph.")
            });
            let id = self.next_local_id();
            self.append(ChatMessage::agent(id, DOCUMENT_AGENT, text), events);
        }

        self.set_uploading(false, events);
    }

    // ── Voice ───────────────────────────────────────────────────────────

    /// Overwrite the draft with the concatenation of all current transcripts.
    pub fn apply_transcripts<S: AsRef<str>>(&mut self, transcripts: &[S], events: &mut Vec<SessionEvent>) {
        let joined: String = transcripts.iter().map(AsRef::as_ref).collect();
        self.set_input(joined, events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curavyom_common::entities::Sender;
    use pretty_assertions::assert_eq;

    fn open_state() -> SessionState {
        let mut state = SessionState::new();
        state.on_open(&mut Vec::new());
        state
    }

    fn response(text: &str) -> ResponseData {
        ResponseData {
            id: None,
            agent: None,
            text: text.to_string(),
            timestamp: None,
            workflow: None,
            metadata: None,
        }
    }

    #[test]
    fn test_new_session_has_welcome_only() {
        let state = SessionState::new();
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].sender, Sender::System);
        assert_eq!(state.status, STATUS_READY);
        assert_eq!(state.connection, ConnectionState::Connecting);
        assert_eq!(state.agents.len(), 5);
    }

    #[test]
    fn test_local_ids_continue_after_welcome() {
        let mut state = SessionState::new();
        assert_eq!(state.next_local_id(), MessageId::Local(2));
        assert_eq!(state.next_local_id(), MessageId::Local(3));
    }

    #[test]
    fn test_open_then_close_is_terminal() {
        let mut state = SessionState::new();
        let mut events = Vec::new();
        state.on_open(&mut events);
        assert_eq!(state.status, STATUS_CONNECTED);
        state.on_closed(&mut events);
        assert_eq!(state.status, STATUS_DISCONNECTED);

        events.clear();
        state.on_open(&mut events);
        state.on_closed(&mut events);
        assert!(events.is_empty());
        assert_eq!(state.connection, ConnectionState::Closed);
    }

    #[test]
    fn test_submit_when_open() {
        let mut state = open_state();
        state.input = "draft".into();
        let mut events = Vec::new();

        let outcome = state.begin_submit("Find repurposing candidates for ALS", &mut events);
        assert_eq!(outcome, SubmitOutcome::Sent);
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].sender, Sender::User);
        assert_eq!(state.input, "");
        assert!(state.typing);
        assert_eq!(state.status, STATUS_PROCESSING);
    }

    #[test]
    fn test_blank_submit_is_ignored() {
        let mut state = open_state();
        let mut events = Vec::new();
        assert_eq!(state.begin_submit("  \n\t ", &mut events), SubmitOutcome::Ignored);
        assert!(events.is_empty());
        assert_eq!(state.messages.len(), 1);
    }

    #[test]
    fn test_submit_when_not_open_keeps_draft() {
        let mut state = SessionState::new();
        state.input = "metformin for glioma".into();
        let mut events = Vec::new();

        assert_eq!(state.begin_submit("metformin for glioma", &mut events), SubmitOutcome::Rejected);
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.status, STATUS_CONNECTION_ERROR);
        assert!(!state.typing);
        assert_eq!(state.input, "metformin for glioma");
    }

    #[test]
    fn test_response_appends_one_agent_message() {
        let mut state = open_state();
        state.begin_submit("hi", &mut Vec::new());
        assert!(state.typing);

        let mut events = Vec::new();
        state.apply_response(response("Here are 3 candidates"), &mut events);

        assert_eq!(state.messages.len(), 3);
        let last = state.messages.last().unwrap();
        assert_eq!(last.sender, Sender::Agent);
        assert_eq!(last.text, "Here are 3 candidates");
        assert!(!state.typing);
        assert_eq!(state.status, STATUS_READY);
        assert_eq!(state.agents.get(MASTER_ORCHESTRATOR), Some(AgentStatus::Active));
        assert!(matches!(events.last(), Some(SessionEvent::Response { .. })));
    }

    #[test]
    fn test_log_sets_status_without_message() {
        let mut state = open_state();
        let mut events = Vec::new();
        state.apply_log("INFO Querying patents".into(), &mut events);
        assert_eq!(state.status, "INFO Querying patents");
        assert_eq!(state.messages.len(), 1);
        assert_eq!(
            events,
            vec![
                SessionEvent::Status { status: "INFO Querying patents".into() },
                SessionEvent::Log { line: "INFO Querying patents".into() },
            ]
        );
    }

    #[test]
    fn test_upload_success_rewrites_placeholder_and_adds_analysis() {
        let mut state = open_state();
        let mut events = Vec::new();
        let id = state.begin_upload("report.pdf", &mut events).unwrap();
        assert!(state.uploading);
        assert_eq!(state.begin_upload("other.pdf", &mut events), None);

        state.finish_upload(&id, "report.pdf", Ok(Some("x".into())), &mut events);
        let texts: Vec<_> = state.messages.iter().skip(1).map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["Uploaded: report.pdf", "x"]);
        assert_eq!(state.messages[2].agent.as_deref(), Some(DOCUMENT_AGENT));
        assert!(!state.uploading);
    }

    #[test]
    fn test_upload_fallback_analysis() {
        let mut state = open_state();
        let id = state.begin_upload("trial.csv", &mut Vec::new()).unwrap();
        state.finish_upload(&id, "trial.csv", Ok(None), &mut Vec::new());
        assert_eq!(
            state.messages.last().unwrap().text,
            "Analyzed trial.csv. Ready to incorporate findings into the knowledge graph."
        );
    }

    #[test]
    fn test_upload_failure_has_no_agent_message() {
        let mut state = open_state();
        let id = state.begin_upload("report.pdf", &mut Vec::new()).unwrap();
        state.finish_upload(&id, "report.pdf", Err(()), &mut Vec::new());
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].text, "Failed to upload report.pdf");
        assert!(state.messages[1].is_upload);
        assert!(!state.uploading);
    }

    #[test]
    fn test_transcripts_overwrite_input() {
        let mut state = SessionState::new();
        state.input = "old".into();
        state.apply_transcripts(&["repurpose ", "aspirin"], &mut Vec::new());
        assert_eq!(state.input, "repurpose aspirin");
    }

    #[test]
    fn test_typed_draft_is_not_echoed() {
        let mut state = open_state();
        state.edit_input("metformin");
        assert_eq!(state.input, "metformin");

        let draft = state.input.clone();
        let mut events = Vec::new();
        assert_eq!(state.begin_submit(&draft, &mut events), SubmitOutcome::Sent);
        let inputs: Vec<_> = events.iter().filter(|e| matches!(e, SessionEvent::Input { .. })).collect();
        assert_eq!(inputs, vec![&SessionEvent::Input { input: String::new() }]);
    }

    #[test]
    fn test_event_json_shape() {
        let event = SessionEvent::Typing { typing: true };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({"type": "typing", "typing": true})
        );
    }
}
