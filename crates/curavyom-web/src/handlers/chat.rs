//! Chat relay: each browser socket mounts one chat session against Agent Core.
//!
//! Browser → server frames are JSON commands (see [`BrowserCommand`]).
//! Server → browser frames are the session's events as JSON, plus the
//! derived demo-view frames in [`RelayFrame`]. Closing the browser socket
//! unmounts the session.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use curavyom_client::{
    ChatSession, ClientError, RecognitionEvent, SessionEvent, SessionHooks, SessionState,
    SpeechRecognizer, UploadFile,
};
use curavyom_common::confidence::{radar_from_metadata, RadarAxis};
use curavyom_common::logfeed::{LogEntry, LogFeed};
use futures_util::{Sink, SinkExt, StreamExt};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::de::{self, Unexpected};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use crate::state::SharedState;

/// Commands sent by the demo page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrowserCommand {
    /// Submit `text`, or the current draft when absent.
    Submit { text: Option<String> },
    Input { text: String },
    Upload {
        name: String,
        content_type: Option<String>,
        /// Base64 file contents; a `data:` URL prefix is accepted.
        data: String,
    },
    /// Toggle voice capture.
    Voice,
    Transcript { transcripts: Vec<String> },
    VoiceEnd,
    VoiceError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceAction {
    Start,
    Stop,
}

/// Frames the relay adds on top of the session's own events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayFrame {
    Snapshot { state: SessionState, voice: bool },
    LogEntry { entry: LogEntry },
    Radar { axes: Vec<RadarAxis> },
    VoiceControl { action: VoiceAction },
    Error { message: String },
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatParams {
    /// The browser has native speech recognition.
    #[serde(default, deserialize_with = "query_flag")]
    pub voice: bool,
}

/// Query-string switch: `1`, `true`, `on` or `yes` (and their negatives).
fn query_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "" | "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(de::Error::invalid_value(Unexpected::Str(&raw), &"a boolean flag")),
    }
}

/// Speech recognition running in the browser, driven over the relay socket.
struct BrowserRecognizer {
    control: mpsc::UnboundedSender<RelayFrame>,
}

impl SpeechRecognizer for BrowserRecognizer {
    fn start(&self) -> Result<(), ClientError> {
        self.control
            .send(RelayFrame::VoiceControl { action: VoiceAction::Start })
            .map_err(|_| ClientError::Voice("browser socket closed".into()))
    }

    fn stop(&self) {
        let _ = self.control.send(RelayFrame::VoiceControl { action: VoiceAction::Stop });
    }
}

/// GET /ws/chat
pub async fn chat_socket(
    ws: WebSocketUpgrade,
    Query(params): Query<ChatParams>,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| relay(socket, state, params.voice))
}

async fn relay(socket: WebSocket, state: SharedState, voice: bool) {
    let (control_tx, mut control_rx) = mpsc::unbounded_channel::<RelayFrame>();

    let mut builder = ChatSession::from_config(&state.config, SessionHooks::default())
        .api_client(state.api.clone());
    if voice {
        builder = builder.recognizer(Arc::new(BrowserRecognizer { control: control_tx.clone() }));
    }
    let session = Arc::new(builder.mount());
    let mut events = BroadcastStream::new(session.subscribe());
    let live = state.session_mounted();
    info!(live, voice, "browser chat mounted");

    let (mut tx, mut rx) = socket.split();
    let mut feed = LogFeed::new();
    let mut rng = StdRng::from_entropy();

    let snapshot = RelayFrame::Snapshot { state: session.snapshot(), voice: session.voice_available() };
    if send_json(&mut tx, &snapshot).await.is_ok() {
        loop {
            let sent = tokio::select! {
                event = events.next() => match event {
                    Some(Ok(event)) => forward_event(&mut tx, &event, &mut feed, &mut rng).await,
                    Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                        warn!(skipped, "browser relay lagged, resending snapshot");
                        let snapshot = RelayFrame::Snapshot {
                            state: session.snapshot(),
                            voice: session.voice_available(),
                        };
                        send_json(&mut tx, &snapshot).await
                    }
                    None => break,
                },
                Some(frame) = control_rx.recv() => send_json(&mut tx, &frame).await,
                incoming = rx.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_command(&session, text.as_str(), &control_tx);
                        Ok(())
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => Ok(()),
                },
            };
            if sent.is_err() {
                debug!("browser socket write failed");
                break;
            }
        }
    }

    session.close().await;
    let live = state.session_unmounted();
    info!(live, "browser chat unmounted");
}

async fn forward_event<S>(
    tx: &mut S,
    event: &SessionEvent,
    feed: &mut LogFeed,
    rng: &mut StdRng,
) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    send_json(tx, event).await?;

    match event {
        SessionEvent::Log { line } => {
            let entry = feed.push_line(line).clone();
            send_json(tx, &RelayFrame::LogEntry { entry }).await
        }
        SessionEvent::Response { data } => {
            match data.metadata.as_ref().and_then(|m| radar_from_metadata(m, rng)) {
                Some(axes) => send_json(tx, &RelayFrame::Radar { axes }).await,
                None => Ok(()),
            }
        }
        _ => Ok(()),
    }
}

async fn send_json<S, T>(tx: &mut S, frame: &T) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
    T: Serialize,
{
    match serde_json::to_string(frame) {
        Ok(json) => tx.send(Message::Text(json.into())).await,
        Err(e) => {
            warn!(error = %e, "could not encode relay frame");
            Ok(())
        }
    }
}

fn handle_command(session: &Arc<ChatSession>, raw: &str, control: &mpsc::UnboundedSender<RelayFrame>) {
    let command = match serde_json::from_str::<BrowserCommand>(raw) {
        Ok(command) => command,
        Err(e) => {
            warn!(error = %e, "ignoring malformed browser command");
            report(control, format!("Unrecognised command: {e}"));
            return;
        }
    };

    let result = match command {
        BrowserCommand::Submit { text: Some(text) } => session.submit(&text).map(drop),
        BrowserCommand::Submit { text: None } => session.submit_input().map(drop),
        BrowserCommand::Input { text } => session.set_input(text),
        BrowserCommand::Upload { name, content_type, data } => match decode_upload(name, content_type, &data) {
            Some(file) => {
                spawn_upload(session.clone(), file, control.clone());
                Ok(())
            }
            None => {
                report(control, "Could not read the selected file".to_string());
                Ok(())
            }
        },
        BrowserCommand::Voice => session.toggle_listening().map(drop),
        BrowserCommand::Transcript { transcripts } => {
            session.handle_recognition(RecognitionEvent::Result { transcripts });
            Ok(())
        }
        BrowserCommand::VoiceEnd => {
            session.handle_recognition(RecognitionEvent::End);
            Ok(())
        }
        BrowserCommand::VoiceError { message } => {
            session.handle_recognition(RecognitionEvent::Error { message });
            Ok(())
        }
    };

    if let Err(e) = result {
        debug!(error = %e, "browser command rejected");
        report(control, e.to_string());
    }
}

fn decode_upload(name: String, content_type: Option<String>, data: &str) -> Option<UploadFile> {
    let payload = match data.strip_prefix("data:") {
        Some(url) => url.split_once(',')?.1,
        None => data,
    };
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    let file = UploadFile::new(name, bytes);
    Some(match content_type.filter(|c| !c.is_empty()) {
        Some(content_type) => file.with_content_type(content_type),
        None => file,
    })
}

fn spawn_upload(session: Arc<ChatSession>, file: UploadFile, control: mpsc::UnboundedSender<RelayFrame>) {
    tokio::spawn(async move {
        match session.upload(file).await {
            Ok(_) | Err(ClientError::SessionClosed) => {}
            Err(e) => report(&control, e.to_string()),
        }
    });
}

fn report(control: &mpsc::UnboundedSender<RelayFrame>, message: String) {
    let _ = control.send(RelayFrame::Error { message });
}
