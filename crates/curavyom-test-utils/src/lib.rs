//! Shared testing utilities for the CuraVyom workspace.
//!
//! - [`MockAgentCore`]: a scriptable stand-in for the backend, served on an
//!   ephemeral port.
//! - [`ScriptedRecognizer`]: a speech recognizer that records start/stop.
//! - [`wait_until`] and [`unreachable_base`] for network-facing tests.

mod mock_core;
mod recognizer;

pub use mock_core::{MockAgentCore, PushFrame, RecordedUpload};
pub use recognizer::ScriptedRecognizer;

use std::time::Duration;

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const WAIT_STEP: Duration = Duration::from_millis(10);

/// Poll `cond` until it holds or five seconds pass. Returns the last result.
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    loop {
        if cond() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(WAIT_STEP).await;
    }
}

/// A loopback port nothing listens on, as `http://127.0.0.1:<port>`.
pub async fn unreachable_base() -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(format!("http://127.0.0.1:{port}"))
}
