//! Speech-to-text seam.
//!
//! Recognition itself is a platform facility. The host supplies a
//! [`SpeechRecognizer`] that can be started and stopped, and pushes the
//! resulting [`RecognitionEvent`]s back into the session with
//! `ChatSession::handle_recognition`.

use crate::error::Result;
use serde::Deserialize;

pub trait SpeechRecognizer: Send + Sync {
    /// Begin continuous recognition.
    fn start(&self) -> Result<()>;

    /// Stop recognition. The host should follow up with
    /// [`RecognitionEvent::End`] once the platform has stopped.
    fn stop(&self);
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecognitionEvent {
    /// All current result transcripts, in order.
    Result { transcripts: Vec<String> },
    End,
    Error { message: String },
}
