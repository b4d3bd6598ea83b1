//! Shared application state for the web server.

use crate::templates::Templates;
use curavyom_client::ApiClient;
use curavyom_common::CuravyomError;
use curavyom_config::{CuravyomConfig, Endpoints};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub config: CuravyomConfig,
    pub endpoints: Endpoints,
    /// HTTP client for Agent Core, shared by form handlers and chat sessions.
    pub api: ApiClient,
    pub templates: Templates,
    live_sessions: AtomicUsize,
}

impl AppState {
    pub fn new(config: CuravyomConfig) -> Result<Self, CuravyomError> {
        let endpoints = config.endpoints();
        Ok(Self {
            api: ApiClient::new(endpoints.clone()),
            endpoints,
            templates: Templates::new()?,
            config,
            live_sessions: AtomicUsize::new(0),
        })
    }

    /// Chat sessions currently mounted by browser sockets.
    pub fn live_sessions(&self) -> usize {
        self.live_sessions.load(Ordering::SeqCst)
    }

    pub(crate) fn session_mounted(&self) -> usize {
        self.live_sessions.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn session_unmounted(&self) -> usize {
        self.live_sessions.fetch_sub(1, Ordering::SeqCst).saturating_sub(1)
    }
}

pub type SharedState = Arc<AppState>;
