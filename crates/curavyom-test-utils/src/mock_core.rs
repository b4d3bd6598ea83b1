//! In-process mock of the Agent Core backend.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use curavyom_config::Endpoints;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A frame the mock pushes to every connected chat socket.
#[derive(Debug, Clone)]
pub enum PushFrame {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpload {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

struct Reply {
    status: StatusCode,
    body: String,
}

struct MockState {
    push: broadcast::Sender<PushFrame>,
    received: Mutex<Vec<String>>,
    auto_replies: Mutex<Vec<String>>,
    upload_reply: Mutex<Reply>,
    upload_delay: Mutex<Duration>,
    form_status: Mutex<StatusCode>,
    uploads: Mutex<Vec<RecordedUpload>>,
    contacts: Mutex<Vec<Value>>,
    subscriptions: Mutex<Vec<Value>>,
    connections: AtomicUsize,
    disconnects: AtomicUsize,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Serves `/ws/chat`, `/api/upload`, `/api/contact` and `/subscribe` on an
/// ephemeral loopback port. Everything received is recorded.
pub struct MockAgentCore {
    addr: SocketAddr,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockAgentCore {
    pub async fn start() -> anyhow::Result<Self> {
        let (push, _) = broadcast::channel(64);
        let state = Arc::new(MockState {
            push,
            received: Mutex::new(Vec::new()),
            auto_replies: Mutex::new(Vec::new()),
            upload_reply: Mutex::new(Reply { status: StatusCode::OK, body: "{}".into() }),
            upload_delay: Mutex::new(Duration::ZERO),
            form_status: Mutex::new(StatusCode::OK),
            uploads: Mutex::new(Vec::new()),
            contacts: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            connections: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/ws/chat", get(chat_socket))
            .route("/api/upload", post(upload))
            .route("/api/contact", post(contact))
            .route("/subscribe", post(subscribe))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!(error = %e, "mock agent core stopped");
            }
        });
        debug!(%addr, "mock agent core listening");

        Ok(Self { addr, state, server })
    }

    pub fn api_base(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_base(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::from_bases(&self.api_base(), &self.ws_base())
    }

    // ── Scripting ───────────────────────────────────────────────────────

    /// Push a text frame to every open chat socket.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.state.push.send(PushFrame::Text(frame.into()));
    }

    pub fn push_json(&self, frame: &Value) {
        self.push(frame.to_string());
    }

    pub fn push_log(&self, content: &str) {
        self.push_json(&json!({"type": "log", "content": content}));
    }

    pub fn push_response(&self, data: Value) {
        self.push_json(&json!({"type": "response", "data": data}));
    }

    pub fn push_binary(&self, bytes: Vec<u8>) {
        let _ = self.state.push.send(PushFrame::Binary(bytes));
    }

    /// Close every open chat socket from the server side.
    pub fn close_all(&self) {
        let _ = self.state.push.send(PushFrame::Close);
    }

    /// Frames sent back on the same socket after each received message.
    pub fn reply_with(&self, frames: Vec<String>) {
        *lock(&self.state.auto_replies) = frames;
    }

    pub fn set_upload_reply(&self, status: u16, body: impl Into<String>) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        *lock(&self.state.upload_reply) = Reply { status, body: body.into() };
    }

    pub fn set_upload_delay(&self, delay: Duration) {
        *lock(&self.state.upload_delay) = delay;
    }

    /// Status returned by the contact and subscribe endpoints.
    pub fn set_form_status(&self, status: u16) {
        *lock(&self.state.form_status) =
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    }

    // ── Recordings ──────────────────────────────────────────────────────

    /// Text frames received on chat sockets, in arrival order.
    pub fn received(&self) -> Vec<String> {
        lock(&self.state.received).clone()
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        lock(&self.state.uploads).clone()
    }

    pub fn contacts(&self) -> Vec<Value> {
        lock(&self.state.contacts).clone()
    }

    pub fn subscriptions(&self) -> Vec<Value> {
        lock(&self.state.subscriptions).clone()
    }

    /// Chat sockets accepted so far. A socket is counted once it can
    /// receive pushes.
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.state.disconnects.load(Ordering::SeqCst)
    }
}

impl Drop for MockAgentCore {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// ── Handlers ────────────────────────────────────────────────────────────

async fn chat_socket(ws: WebSocketUpgrade, State(state): State<Arc<MockState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(socket: WebSocket, state: Arc<MockState>) {
    let mut pushes = state.push.subscribe();
    state.connections.fetch_add(1, Ordering::SeqCst);
    let (mut tx, mut rx) = socket.split();

    loop {
        tokio::select! {
            frame = pushes.recv() => {
                let sent = match frame {
                    Ok(PushFrame::Text(text)) => tx.send(Message::Text(text.into())).await,
                    Ok(PushFrame::Binary(bytes)) => tx.send(Message::Binary(bytes.into())).await,
                    Ok(PushFrame::Close) => {
                        let _ = tx.send(Message::Close(None)).await;
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if sent.is_err() {
                    break;
                }
            }
            incoming = rx.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    lock(&state.received).push(text.as_str().to_string());
                    let replies = lock(&state.auto_replies).clone();
                    for reply in replies {
                        if tx.send(Message::Text(reply.into())).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    let _ = tx.send(Message::Close(None)).await;
                    break;
                }
                Some(Ok(_)) => {}
            }
        }
    }

    state.disconnects.fetch_add(1, Ordering::SeqCst);
}

async fn upload(State(state): State<Arc<MockState>>, mut multipart: Multipart) -> impl IntoResponse {
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        lock(&state.uploads).push(RecordedUpload { field: name, file_name, content_type, bytes });
    }

    let delay = *lock(&state.upload_delay);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let (status, body) = {
        let reply = lock(&state.upload_reply);
        (reply.status, reply.body.clone())
    };
    (status, [(axum::http::header::CONTENT_TYPE, "application/json")], body)
}

async fn contact(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> StatusCode {
    lock(&state.contacts).push(body);
    *lock(&state.form_status)
}

async fn subscribe(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> StatusCode {
    lock(&state.subscriptions).push(body);
    *lock(&state.form_status)
}
