//! End-to-end behaviour of a mounted chat session against the mock Agent Core.

use curavyom_client::state::{STATUS_CONNECTION_ERROR, STATUS_DISCONNECTED, STATUS_READY};
use curavyom_client::{
    ChatSession, ClientError, ConnectionState, RecognitionEvent, SessionEvent, SessionHooks,
    SubmitOutcome, UploadFile, UploadOutcome,
};
use curavyom_common::activity::{AgentActivity, AgentStatus, MASTER_ORCHESTRATOR};
use curavyom_common::entities::{MessageId, Sender, DOCUMENT_AGENT};
use curavyom_config::Endpoints;
use curavyom_test_utils::{unreachable_base, wait_until, MockAgentCore, ScriptedRecognizer};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PULSE: Duration = Duration::from_millis(200);

async fn mount_with(mock: &MockAgentCore, hooks: SessionHooks) -> ChatSession {
    let session = ChatSession::builder(mock.endpoints())
        .hooks(hooks)
        .agent_pulse(PULSE)
        .mount();
    assert!(wait_until(|| session.snapshot().connection == ConnectionState::Open).await);
    assert!(wait_until(|| mock.connections() == 1).await);
    session
}

async fn mount(mock: &MockAgentCore) -> ChatSession {
    mount_with(mock, SessionHooks::default()).await
}

fn texts(session: &ChatSession) -> Vec<String> {
    session.snapshot().messages.iter().skip(1).map(|m| m.text.clone()).collect()
}

fn pdf() -> UploadFile {
    UploadFile::new("report.pdf", b"%PDF-1.7 trial summary".to_vec())
}

// ── Inbound ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn response_appends_exactly_one_agent_message() {
    let mock = MockAgentCore::start().await.unwrap();
    let session = mount(&mock).await;

    let outcome = session.submit("Which statins show anti-inflammatory effects?").unwrap();
    assert_eq!(outcome, SubmitOutcome::Sent);
    assert!(session.snapshot().typing);
    assert!(wait_until(|| mock.received().len() == 1).await);
    assert_eq!(mock.received(), vec!["Which statins show anti-inflammatory effects?"]);

    mock.push_response(json!({"agent": "Clinical Agent", "text": "Atorvastatin, 4 trials"}));
    assert!(wait_until(|| session.snapshot().messages.len() == 3).await);

    let state = session.snapshot();
    let last = state.messages.last().unwrap();
    assert_eq!(last.sender, Sender::Agent);
    assert_eq!(last.agent.as_deref(), Some("Clinical Agent"));
    assert_eq!(last.text, "Atorvastatin, 4 trials");
    assert!(!state.typing);
    assert_eq!(state.status, STATUS_READY);

    session.close().await;
}

#[tokio::test]
async fn log_frames_update_status_only() {
    let mock = MockAgentCore::start().await.unwrap();
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    let hooks = SessionHooks::default().on_log(move |line| sink.lock().unwrap().push(line.to_string()));
    let session = mount_with(&mock, hooks).await;

    mock.push_log("INFO Querying ClinicalTrials.gov");
    assert!(wait_until(|| session.snapshot().status == "INFO Querying ClinicalTrials.gov").await);

    assert_eq!(session.snapshot().messages.len(), 1);
    assert_eq!(*lines.lock().unwrap(), vec!["INFO Querying ClinicalTrials.gov"]);

    session.close().await;
}

#[tokio::test]
async fn unknown_frames_are_ignored() {
    let mock = MockAgentCore::start().await.unwrap();
    let session = mount(&mock).await;
    let before = session.snapshot();

    mock.push("definitely not json");
    mock.push_json(&json!({"type": "heartbeat", "seq": 1}));
    mock.push_json(&json!({"type": "response"}));
    mock.push_binary(vec![0xde, 0xad, 0xbe, 0xef]);
    mock.push_log("sentinel");
    assert!(wait_until(|| session.snapshot().status == "sentinel").await);

    let after = session.snapshot();
    assert_eq!(after.messages, before.messages);
    assert_eq!(after.connection, ConnectionState::Open);

    session.close().await;
}

#[tokio::test]
async fn response_hook_sees_raw_data_and_server_id_is_kept() {
    let mock = MockAgentCore::start().await.unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let hooks = SessionHooks::default().on_response(move |data| sink.lock().unwrap().push(data.clone()));
    let session = mount_with(&mock, hooks).await;
    let mut events = session.subscribe();

    mock.push_response(json!({
        "id": 4711,
        "text": "Confidence 92%",
        "metadata": {"confidence_score": 92}
    }));
    assert!(wait_until(|| seen.lock().unwrap().len() == 1).await);

    let data = seen.lock().unwrap()[0].clone();
    assert_eq!(data.metadata, Some(json!({"confidence_score": 92})));
    let last = session.snapshot().messages.last().cloned().unwrap();
    assert_eq!(last.id, MessageId::Server("4711".into()));
    assert_eq!(last.agent.as_deref(), Some("Master Agent"));

    let mut appended = false;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::MessageAppended { message } = event {
            assert_eq!(message.text, "Confidence 92%");
            appended = true;
        }
    }
    assert!(appended);

    session.close().await;
}

// ── Agent pulse ─────────────────────────────────────────────────────────

fn activity_recorder() -> (Arc<Mutex<Vec<AgentActivity>>>, SessionHooks) {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let sink = updates.clone();
    let hooks = SessionHooks::default().on_agent_update(move |a| sink.lock().unwrap().push(a.clone()));
    (updates, hooks)
}

#[tokio::test]
async fn response_pulses_orchestrator_active_then_standby() {
    let mock = MockAgentCore::start().await.unwrap();
    let (updates, hooks) = activity_recorder();
    let session = mount_with(&mock, hooks).await;

    mock.push_response(json!({"text": "done"}));
    assert!(wait_until(|| updates.lock().unwrap().len() == 2).await);

    let updates = updates.lock().unwrap().clone();
    assert_eq!(updates[0], AgentActivity::single(MASTER_ORCHESTRATOR, AgentStatus::Active));
    assert_eq!(updates[1], AgentActivity::single(MASTER_ORCHESTRATOR, AgentStatus::Standby));
    assert_eq!(session.snapshot().agents.get(MASTER_ORCHESTRATOR), Some(AgentStatus::Standby));
    assert_eq!(session.snapshot().agents.get("Patent Analyst"), Some(AgentStatus::Active));

    session.close().await;
}

#[tokio::test]
async fn pulse_never_fires_after_unmount() {
    let mock = MockAgentCore::start().await.unwrap();
    let (updates, hooks) = activity_recorder();
    let session = mount_with(&mock, hooks).await;

    mock.push_response(json!({"text": "done"}));
    assert!(wait_until(|| updates.lock().unwrap().len() == 1).await);
    session.close().await;

    tokio::time::sleep(PULSE * 3).await;
    assert_eq!(updates.lock().unwrap().len(), 1);
}

// ── Outbound ────────────────────────────────────────────────────────────

#[tokio::test]
async fn blank_submit_sends_nothing() {
    let mock = MockAgentCore::start().await.unwrap();
    let session = mount(&mock).await;

    assert_eq!(session.submit("   \t").unwrap(), SubmitOutcome::Ignored);
    assert_eq!(session.submit("").unwrap(), SubmitOutcome::Ignored);
    assert_eq!(session.snapshot().messages.len(), 1);

    session.submit("sentinel").unwrap();
    assert!(wait_until(|| !mock.received().is_empty()).await);
    assert_eq!(mock.received(), vec!["sentinel"]);

    session.close().await;
}

#[tokio::test]
async fn submit_input_sends_draft_and_clears_it() {
    let mock = MockAgentCore::start().await.unwrap();
    let session = mount(&mock).await;

    session.set_input("Repurpose metformin for oncology").unwrap();
    assert_eq!(session.submit_input().unwrap(), SubmitOutcome::Sent);
    assert_eq!(session.snapshot().input, "");
    assert!(wait_until(|| mock.received() == vec!["Repurpose metformin for oncology"]).await);

    session.close().await;
}

#[tokio::test]
async fn send_while_not_open_fails_fast() {
    let api = unreachable_base().await.unwrap();
    let ws = api.replacen("http", "ws", 1);
    let session = ChatSession::builder(Endpoints::from_bases(&api, &ws)).mount();

    assert!(wait_until(|| session.snapshot().connection == ConnectionState::Closed).await);
    assert_eq!(session.snapshot().status, STATUS_DISCONNECTED);

    session.set_input("draft question").unwrap();
    assert_eq!(session.submit_input().unwrap(), SubmitOutcome::Rejected);

    let state = session.snapshot();
    assert_eq!(state.messages.len(), 1);
    assert_eq!(state.status, STATUS_CONNECTION_ERROR);
    assert!(!state.typing);
    assert_eq!(state.input, "draft question");

    session.close().await;
}

#[tokio::test]
async fn remote_close_is_terminal() {
    let mock = MockAgentCore::start().await.unwrap();
    let session = mount(&mock).await;

    mock.close_all();
    assert!(wait_until(|| session.snapshot().connection == ConnectionState::Closed).await);
    assert_eq!(session.snapshot().status, STATUS_DISCONNECTED);

    assert_eq!(session.submit("anyone there?").unwrap(), SubmitOutcome::Rejected);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(mock.connections(), 1);

    session.close().await;
}

// ── Upload ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_success_adds_two_messages() {
    let mock = MockAgentCore::start().await.unwrap();
    mock.set_upload_reply(200, r#"{"analysis":"x"}"#);
    let session = mount(&mock).await;

    let outcome = session.upload(pdf()).await.unwrap();
    assert_eq!(outcome, UploadOutcome::Uploaded { analysis: Some("x".into()) });
    assert_eq!(texts(&session), vec!["Uploaded: report.pdf", "x"]);

    let state = session.snapshot();
    assert!(state.messages[1].is_upload);
    assert_eq!(state.messages[2].agent.as_deref(), Some(DOCUMENT_AGENT));
    assert!(!state.uploading);

    let uploads = mock.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].field, "file");
    assert_eq!(uploads[0].file_name.as_deref(), Some("report.pdf"));
    assert_eq!(uploads[0].content_type.as_deref(), Some("application/pdf"));
    assert_eq!(uploads[0].bytes, b"%PDF-1.7 trial summary");

    session.close().await;
}

#[tokio::test]
async fn upload_without_analysis_uses_fallback() {
    let mock = MockAgentCore::start().await.unwrap();
    mock.set_upload_reply(200, r#"{"status":"stored"}"#);
    let session = mount(&mock).await;

    session.upload(pdf()).await.unwrap();
    assert_eq!(
        texts(&session),
        vec![
            "Uploaded: report.pdf",
            "Analyzed report.pdf. Ready to incorporate findings into the knowledge graph."
        ]
    );

    session.close().await;
}

#[tokio::test]
async fn upload_network_failure_rewrites_placeholder() {
    let api = unreachable_base().await.unwrap();
    let mock = MockAgentCore::start().await.unwrap();
    let session = ChatSession::builder(Endpoints::from_bases(&api, &mock.ws_base())).mount();

    let outcome = session.upload(pdf()).await.unwrap();
    assert!(matches!(outcome, UploadOutcome::Failed { .. }));
    assert_eq!(texts(&session), vec!["Failed to upload report.pdf"]);
    assert!(!session.snapshot().uploading);

    session.close().await;
}

#[tokio::test]
async fn upload_non_success_status_is_failure() {
    let mock = MockAgentCore::start().await.unwrap();
    mock.set_upload_reply(500, r#"{"analysis":"should not be shown"}"#);
    let session = mount(&mock).await;

    let outcome = session.upload(pdf()).await.unwrap();
    assert!(matches!(outcome, UploadOutcome::Failed { .. }));
    assert_eq!(texts(&session), vec!["Failed to upload report.pdf"]);

    session.close().await;
}

#[tokio::test]
async fn upload_unparseable_body_is_failure() {
    let mock = MockAgentCore::start().await.unwrap();
    mock.set_upload_reply(200, "<html>ok</html>");
    let session = mount(&mock).await;

    let outcome = session.upload(pdf()).await.unwrap();
    assert!(matches!(outcome, UploadOutcome::Failed { .. }));
    assert_eq!(texts(&session), vec!["Failed to upload report.pdf"]);

    session.close().await;
}

#[tokio::test]
async fn only_one_upload_at_a_time() {
    let mock = MockAgentCore::start().await.unwrap();
    mock.set_upload_delay(Duration::from_millis(300));
    let session = Arc::new(mount(&mock).await);

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.upload(pdf()).await }
    });
    assert!(wait_until(|| session.snapshot().uploading).await);

    let second = session.upload(UploadFile::new("second.csv", b"a,b".to_vec())).await;
    assert!(matches!(second, Err(ClientError::UploadInProgress)));

    assert!(matches!(first.await.unwrap(), Ok(UploadOutcome::Uploaded { .. })));
    assert_eq!(mock.uploads().len(), 1);
    assert_eq!(texts(&session)[0], "Uploaded: report.pdf");

    session.close().await;
}

#[tokio::test]
async fn upload_result_after_unmount_is_dropped() {
    let mock = MockAgentCore::start().await.unwrap();
    mock.set_upload_reply(200, r#"{"analysis":"late"}"#);
    mock.set_upload_delay(Duration::from_millis(300));
    let session = Arc::new(mount(&mock).await);

    let pending = tokio::spawn({
        let session = session.clone();
        async move { session.upload(pdf()).await }
    });
    assert!(wait_until(|| session.snapshot().uploading).await);
    session.close().await;

    assert!(matches!(pending.await.unwrap(), Err(ClientError::SessionClosed)));
    assert_eq!(texts(&session), vec!["Uploading report.pdf..."]);
}

// ── Voice ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn voice_results_overwrite_draft_until_end() {
    let mock = MockAgentCore::start().await.unwrap();
    let recognizer = Arc::new(ScriptedRecognizer::new());
    let session = ChatSession::builder(mock.endpoints()).recognizer(recognizer.clone()).mount();
    assert!(session.voice_available());

    session.set_input("typed text").unwrap();
    assert!(session.toggle_listening().unwrap());
    assert!(session.snapshot().listening);
    assert_eq!(recognizer.starts(), 1);

    session.handle_recognition(RecognitionEvent::Result { transcripts: vec!["find drugs".into()] });
    session.handle_recognition(RecognitionEvent::Result {
        transcripts: vec!["find drugs ".into(), "for ALS".into()],
    });
    assert_eq!(session.snapshot().input, "find drugs for ALS");

    assert!(!session.toggle_listening().unwrap());
    assert_eq!(recognizer.stops(), 1);
    session.handle_recognition(RecognitionEvent::End);
    assert!(!session.snapshot().listening);

    // Nothing is sent automatically.
    assert!(mock.received().is_empty());
    assert_eq!(session.snapshot().messages.len(), 1);

    session.close().await;
}

#[tokio::test]
async fn voice_error_resets_listening() {
    let mock = MockAgentCore::start().await.unwrap();
    let recognizer = Arc::new(ScriptedRecognizer::new());
    let session = ChatSession::builder(mock.endpoints()).recognizer(recognizer.clone()).mount();

    session.toggle_listening().unwrap();
    session.handle_recognition(RecognitionEvent::Error { message: "no-speech".into() });
    assert!(!session.snapshot().listening);

    recognizer.deny_microphone();
    assert!(matches!(session.toggle_listening(), Err(ClientError::Voice(_))));
    assert!(!session.snapshot().listening);

    session.close().await;
}

#[tokio::test]
async fn voice_unavailable_without_recognizer() {
    let mock = MockAgentCore::start().await.unwrap();
    let session = mount(&mock).await;
    assert!(!session.voice_available());
    assert!(matches!(session.toggle_listening(), Err(ClientError::Voice(_))));
    session.close().await;
}

// ── Unmount ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn unmount_closes_connection_and_stops_recognition() {
    let mock = MockAgentCore::start().await.unwrap();
    let recognizer = Arc::new(ScriptedRecognizer::new());
    let session = ChatSession::builder(mock.endpoints())
        .recognizer(recognizer.clone())
        .agent_pulse(PULSE)
        .mount();
    assert!(wait_until(|| mock.connections() == 1).await);
    session.toggle_listening().unwrap();

    session.close().await;
    assert!(session.is_closed());
    assert_eq!(recognizer.stops(), 1);
    assert!(wait_until(|| mock.disconnects() == 1).await);

    let frozen = session.snapshot();
    assert_eq!(frozen.connection, ConnectionState::Closed);

    mock.push_response(json!({"text": "too late"}));
    session.handle_recognition(RecognitionEvent::Result { transcripts: vec!["ignored".into()] });
    assert!(matches!(session.submit("hello"), Err(ClientError::SessionClosed)));
    assert!(matches!(session.set_input("x"), Err(ClientError::SessionClosed)));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(session.snapshot(), frozen);
}

#[tokio::test]
async fn dropping_the_session_unmounts_it() {
    let mock = MockAgentCore::start().await.unwrap();
    let session = mount(&mock).await;
    drop(session);
    assert!(wait_until(|| mock.disconnects() == 1).await);
}
