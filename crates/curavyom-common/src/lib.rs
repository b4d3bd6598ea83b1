//! curavyom-common — Shared types, errors, and canned data used across all CuraVyom crates.

pub mod error;
pub mod entities;
pub mod activity;
pub mod confidence;
pub mod dashboard;
pub mod forms;
pub mod logfeed;

// Re-export commonly used types
pub use activity::{AgentActivity, AgentStatus};
pub use entities::{ChatMessage, MessageId, Sender};
pub use error::{CuravyomError, Result};
pub use forms::{ContactForm, FormStatus, SubscribeRequest};
