//! The chat session: one per mounted chat view.
//!
//! Mounting spawns the connection task; closing (or dropping) the session
//! tears it down, cancels the agent pulse and stops voice capture. After
//! that no further state changes are applied, including late upload results.

use crate::api::{ApiClient, UploadFile};
use crate::error::{ClientError, Result};
use crate::protocol::{self, InboundMessage, ResponseData};
use crate::pulse::DelayedAction;
use crate::state::{SessionEvent, SessionState};
use crate::voice::{RecognitionEvent, SpeechRecognizer};
use curavyom_common::activity::{AgentActivity, AgentStatus, MASTER_ORCHESTRATOR};
use curavyom_config::{CuravyomConfig, Endpoints};
use futures_util::{SinkExt, StreamExt};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

pub use crate::state::SubmitOutcome;

const EVENT_CAPACITY: usize = 256;
const DEFAULT_PULSE: Duration = Duration::from_secs(2);
const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(1);

// ── Hooks ───────────────────────────────────────────────────────────────

type LogHook = Arc<dyn Fn(&str) + Send + Sync>;
type ActivityHook = Arc<dyn Fn(&AgentActivity) + Send + Sync>;
type ResponseHook = Arc<dyn Fn(&ResponseData) + Send + Sync>;

/// Optional callbacks supplied by the host view. They run on the session's
/// tasks, after the state lock is released.
#[derive(Clone, Default)]
pub struct SessionHooks {
    on_log: Option<LogHook>,
    on_agent_update: Option<ActivityHook>,
    on_response: Option<ResponseHook>,
}

impl SessionHooks {
    /// Every backend log line.
    pub fn on_log(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_log = Some(Arc::new(hook));
        self
    }

    /// Every agent-activity update (the changed entries only).
    pub fn on_agent_update(mut self, hook: impl Fn(&AgentActivity) + Send + Sync + 'static) -> Self {
        self.on_agent_update = Some(Arc::new(hook));
        self
    }

    /// The raw `data` of every response.
    pub fn on_response(mut self, hook: impl Fn(&ResponseData) + Send + Sync + 'static) -> Self {
        self.on_response = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for SessionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHooks")
            .field("on_log", &self.on_log.is_some())
            .field("on_agent_update", &self.on_agent_update.is_some())
            .field("on_response", &self.on_response.is_some())
            .finish()
    }
}

// ── Outcomes ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded { analysis: Option<String> },
    Failed { reason: String },
}

// ── Builder ─────────────────────────────────────────────────────────────

pub struct SessionBuilder {
    chat_url: String,
    api: ApiClient,
    hooks: SessionHooks,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    pulse: Duration,
    close_grace: Duration,
}

impl SessionBuilder {
    pub fn hooks(mut self, hooks: SessionHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn api_client(mut self, api: ApiClient) -> Self {
        self.api = api;
        self
    }

    pub fn agent_pulse(mut self, pulse: Duration) -> Self {
        self.pulse = pulse;
        self
    }

    pub fn close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    /// Create the session and start connecting. Must be called inside a
    /// tokio runtime.
    pub fn mount(self) -> ChatSession {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner { state: SessionState::new(), outbound: Some(outbound_tx) }),
            events,
            hooks: self.hooks,
            closed: AtomicBool::new(false),
            pulse: DelayedAction::new(self.pulse),
        });

        info!(url = %self.chat_url, "mounting chat session");
        let connection = tokio::spawn(run_connection(shared.clone(), self.chat_url, outbound_rx));

        ChatSession {
            shared,
            api: self.api,
            recognizer: self.recognizer,
            connection: Mutex::new(Some(connection)),
            close_grace: self.close_grace,
        }
    }
}

// ── Shared state ────────────────────────────────────────────────────────

struct Inner {
    state: SessionState,
    /// Dropped on unmount so the writer closes the socket.
    outbound: Option<mpsc::UnboundedSender<String>>,
}

struct Shared {
    inner: Mutex<Inner>,
    events: broadcast::Sender<SessionEvent>,
    hooks: SessionHooks,
    closed: AtomicBool,
    pulse: DelayedAction,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a mutation unless the session is closed. Events and hooks are
    /// dispatched after the lock is released.
    fn update<R>(&self, f: impl FnOnce(&mut Inner, &mut Vec<SessionEvent>) -> R) -> Option<R> {
        let mut events = Vec::new();
        let result = {
            let mut inner = self.lock();
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            f(&mut inner, &mut events)
        };
        self.dispatch(events);
        Some(result)
    }

    /// Mark the session closed. Returns whether recognition was running, or
    /// `None` if it was already closed.
    fn shutdown(&self) -> Option<bool> {
        let mut events = Vec::new();
        let listening = {
            let mut inner = self.lock();
            if self.closed.swap(true, Ordering::AcqRel) {
                return None;
            }
            inner.state.on_closed(&mut events);
            inner.outbound = None;
            inner.state.listening
        };
        self.pulse.cancel();
        self.dispatch(events);
        Some(listening)
    }

    fn dispatch(&self, events: Vec<SessionEvent>) {
        for event in events {
            match &event {
                SessionEvent::Log { line } => {
                    if let Some(hook) = &self.hooks.on_log {
                        hook(line);
                    }
                }
                SessionEvent::AgentActivity { agents } => {
                    if let Some(hook) = &self.hooks.on_agent_update {
                        hook(agents);
                    }
                }
                SessionEvent::Response { data } => {
                    if let Some(hook) = &self.hooks.on_response {
                        hook(data);
                    }
                }
                _ => {}
            }
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }

    fn handle_frame(self: &Arc<Self>, frame: &str) {
        match protocol::decode(frame) {
            InboundMessage::Log { content } => {
                debug!(%content, "agent log");
                self.update(|inner, ev| inner.state.apply_log(content, ev));
            }
            InboundMessage::Response(data) => {
                let applied = self.update(|inner, ev| inner.state.apply_response(data, ev));
                if applied.is_some() {
                    self.schedule_pulse();
                }
            }
            InboundMessage::Unknown { raw } => {
                warn!(frame = %raw, "ignoring unrecognised frame from Agent Core");
            }
        }
    }

    /// Flip the orchestrator back to standby once the pulse elapses. A newer
    /// response restarts the timer.
    fn schedule_pulse(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.pulse.schedule(move || {
            if let Some(shared) = weak.upgrade() {
                shared.update(|inner, ev| {
                    inner.state.apply_agent_activity(
                        AgentActivity::single(MASTER_ORCHESTRATOR, AgentStatus::Standby),
                        ev,
                    )
                });
            }
        });
    }
}

// ── Connection task ─────────────────────────────────────────────────────

async fn run_connection(
    shared: Arc<Shared>,
    url: String,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            warn!(%url, error = %e, "could not connect to Agent Core");
            shared.update(|inner, ev| inner.state.on_closed(ev));
            return;
        }
    };

    let (mut sink, mut source) = stream.split();
    if shared.update(|inner, ev| inner.state.on_open(ev)).is_none() {
        // Unmounted while the handshake was in flight.
        let _ = sink.close().await;
        return;
    }
    info!(%url, "connected to Agent Core");

    let writer_shared = shared.clone();
    let writer = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if let Err(e) = sink.send(Message::text(text)).await {
                warn!(error = %e, "failed to send chat frame");
                writer_shared.update(|inner, ev| {
                    inner.outbound = None;
                    inner.state.on_closed(ev);
                });
                return;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => shared.handle_frame(text.as_str()),
            Ok(Message::Binary(bytes)) => {
                warn!(len = bytes.len(), "ignoring binary frame from Agent Core");
            }
            Ok(Message::Close(reason)) => {
                info!(?reason, "Agent Core closed the connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "chat connection error");
                break;
            }
        }
    }

    writer.abort();
    shared.update(|inner, ev| inner.state.on_closed(ev));
    debug!("connection task finished");
}

// ── Session ─────────────────────────────────────────────────────────────

pub struct ChatSession {
    shared: Arc<Shared>,
    api: ApiClient,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    connection: Mutex<Option<JoinHandle<()>>>,
    close_grace: Duration,
}

impl ChatSession {
    /// Start building a session against explicit endpoints.
    pub fn builder(endpoints: Endpoints) -> SessionBuilder {
        SessionBuilder {
            chat_url: endpoints.chat.clone(),
            api: ApiClient::new(endpoints),
            hooks: SessionHooks::default(),
            recognizer: None,
            pulse: DEFAULT_PULSE,
            close_grace: DEFAULT_CLOSE_GRACE,
        }
    }

    pub fn from_config(config: &CuravyomConfig, hooks: SessionHooks) -> SessionBuilder {
        Self::builder(config.endpoints())
            .hooks(hooks)
            .agent_pulse(config.agent_pulse())
            .close_grace(config.close_grace())
    }

    /// Receive every state change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.shared.lock().state.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub fn voice_available(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Submit `text` as a user message.
    pub fn submit(&self, text: &str) -> Result<SubmitOutcome> {
        self.shared
            .update(|inner, ev| submit_text(inner, text, ev))
            .ok_or(ClientError::SessionClosed)
    }

    /// Submit whatever is in the draft input.
    pub fn submit_input(&self) -> Result<SubmitOutcome> {
        self.shared
            .update(|inner, ev| {
                let text = inner.state.input.clone();
                submit_text(inner, &text, ev)
            })
            .ok_or(ClientError::SessionClosed)
    }

    /// Record the draft as typed by the host view. No `Input` event is
    /// emitted for it.
    pub fn set_input(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.shared
            .update(|inner, _| inner.state.edit_input(text))
            .ok_or(ClientError::SessionClosed)
    }

    /// Upload a document. Only one upload runs at a time; the result is
    /// discarded if the session closes first.
    pub async fn upload(&self, file: UploadFile) -> Result<UploadOutcome> {
        let name = file.name.clone();
        let id = self
            .shared
            .update(|inner, ev| inner.state.begin_upload(&name, ev))
            .ok_or(ClientError::SessionClosed)?
            .ok_or(ClientError::UploadInProgress)?;

        info!(file = %name, "uploading document");
        let (outcome, resolved) = match self.api.upload(file).await {
            Ok(response) => {
                let analysis = response.analysis_text();
                info!(file = %name, "upload accepted");
                (UploadOutcome::Uploaded { analysis: analysis.clone() }, Ok(analysis))
            }
            Err(e) => {
                warn!(file = %name, error = %e, "upload failed");
                (UploadOutcome::Failed { reason: e.to_string() }, Err(()))
            }
        };

        match self
            .shared
            .update(|inner, ev| inner.state.finish_upload(&id, &name, resolved, ev))
        {
            Some(()) => Ok(outcome),
            None => {
                debug!(file = %name, "session closed before upload finished, dropping result");
                Err(ClientError::SessionClosed)
            }
        }
    }

    /// Start or stop voice capture. Returns whether recognition is now
    /// starting. Stopping leaves `listening` set until the recognizer
    /// reports [`RecognitionEvent::End`].
    pub fn toggle_listening(&self) -> Result<bool> {
        let recognizer = self
            .recognizer
            .as_ref()
            .ok_or_else(|| ClientError::Voice("no speech recognizer available".into()))?;
        if self.is_closed() {
            return Err(ClientError::SessionClosed);
        }

        if self.snapshot().listening {
            recognizer.stop();
            return Ok(false);
        }

        recognizer.start()?;
        self.shared
            .update(|inner, ev| inner.state.set_listening(true, ev))
            .ok_or(ClientError::SessionClosed)?;
        Ok(true)
    }

    pub fn handle_recognition(&self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Result { transcripts } => {
                self.shared.update(|inner, ev| inner.state.apply_transcripts(&transcripts, ev));
            }
            RecognitionEvent::End => {
                self.shared.update(|inner, ev| inner.state.set_listening(false, ev));
            }
            RecognitionEvent::Error { message } => {
                warn!(%message, "speech recognition error");
                self.shared.update(|inner, ev| inner.state.set_listening(false, ev));
            }
        }
    }

    /// Unmount: close the connection, cancel the pulse and stop recognition.
    /// Waits briefly for the close handshake.
    pub async fn close(&self) {
        self.teardown();

        let handle = self.connection.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(mut handle) = handle {
            if tokio::time::timeout(self.close_grace, &mut handle).await.is_err() {
                debug!("close handshake timed out");
                handle.abort();
            }
        }
    }

    fn teardown(&self) {
        if let Some(was_listening) = self.shared.shutdown() {
            info!("unmounting chat session");
            if was_listening {
                if let Some(recognizer) = &self.recognizer {
                    recognizer.stop();
                }
            }
        }
    }
}

/// Submit `text`, failing fast if the writer has already exited even though
/// the reader has not yet seen the connection drop.
fn submit_text(inner: &mut Inner, text: &str, events: &mut Vec<SessionEvent>) -> SubmitOutcome {
    if inner.outbound.as_ref().is_some_and(mpsc::UnboundedSender::is_closed) {
        debug!("writer gone, marking connection closed");
        inner.outbound = None;
        inner.state.on_closed(events);
    }

    let outcome = inner.state.begin_submit(text, events);
    if outcome == SubmitOutcome::Sent {
        match &inner.outbound {
            Some(tx) if tx.send(text.to_string()).is_ok() => {}
            _ => debug!("writer gone, dropping outbound frame"),
        }
    }
    outcome
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.teardown();
        if let Some(handle) = self.connection.lock().unwrap_or_else(PoisonError::into_inner).take() {
            handle.abort();
        }
    }
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("closed", &self.is_closed())
            .field("voice", &self.voice_available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ConnectionState, STATUS_CONNECTION_ERROR, STATUS_PROCESSING};
    use pretty_assertions::assert_eq;

    fn open_inner() -> (Inner, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = SessionState::new();
        state.on_open(&mut Vec::new());
        (Inner { state, outbound: Some(tx) }, rx)
    }

    #[test]
    fn test_submit_hands_text_to_writer() {
        let (mut inner, mut rx) = open_inner();
        let mut events = Vec::new();

        assert_eq!(submit_text(&mut inner, "find ALS candidates", &mut events), SubmitOutcome::Sent);
        assert_eq!(rx.try_recv().unwrap(), "find ALS candidates");
        assert_eq!(inner.state.status, STATUS_PROCESSING);
        assert!(inner.state.typing);
    }

    #[test]
    fn test_submit_after_writer_exit_fails_fast() {
        let (mut inner, rx) = open_inner();
        drop(rx);
        let mut events = Vec::new();

        assert_eq!(submit_text(&mut inner, "hello", &mut events), SubmitOutcome::Rejected);
        assert!(inner.outbound.is_none());
        assert_eq!(inner.state.connection, ConnectionState::Closed);
        assert_eq!(inner.state.status, STATUS_CONNECTION_ERROR);
        assert!(!inner.state.typing);
        assert_eq!(inner.state.messages.len(), 1);
        assert!(events.contains(&SessionEvent::Connection { state: ConnectionState::Closed }));
    }
}
