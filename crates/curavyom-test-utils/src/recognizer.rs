use curavyom_client::{ClientError, SpeechRecognizer};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Records how often recognition was started and stopped. Events are pushed
/// by the test through `ChatSession::handle_recognition`.
#[derive(Debug, Default)]
pub struct ScriptedRecognizer {
    starts: AtomicUsize,
    stops: AtomicUsize,
    fail_start: AtomicBool,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `start` fail, as when the microphone is denied.
    pub fn deny_microphone(&self) {
        self.fail_start.store(true, Ordering::SeqCst);
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn start(&self) -> Result<(), ClientError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(ClientError::Voice("microphone permission denied".into()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
