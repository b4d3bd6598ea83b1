//! curavyom-client — Chat session client for the CuraVyom Agent Core.
//!
//! A [`ChatSession`] is created when a chat view mounts and closed when it
//! unmounts. It owns exactly one streaming connection (no reconnect), turns
//! backend pushes into UI state, sends user text upstream, and runs the file
//! upload and voice input side flows.
//!
//! ```rust,no_run
//! use curavyom_client::{ChatSession, SessionHooks};
//! use curavyom_config::CuravyomConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CuravyomConfig::load()?;
//! let hooks = SessionHooks::default().on_log(|line| println!("log: {line}"));
//! let session = ChatSession::from_config(&config, hooks).mount();
//!
//! session.submit("Which approved drugs could be repurposed for Alzheimer's?")?;
//! // ... later, when the view goes away:
//! session.close().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod error;
pub mod forms;
pub mod protocol;
pub mod pulse;
pub mod session;
pub mod state;
pub mod voice;

pub use api::{ApiClient, UploadFile, UploadResponse};
pub use error::{ClientError, Result};
pub use forms::FormTracker;
pub use protocol::{InboundMessage, ResponseData};
pub use pulse::DelayedAction;
pub use session::{ChatSession, SessionBuilder, SessionHooks, SubmitOutcome, UploadOutcome};
pub use state::{ConnectionState, SessionEvent, SessionState};
pub use voice::{RecognitionEvent, SpeechRecognizer};
