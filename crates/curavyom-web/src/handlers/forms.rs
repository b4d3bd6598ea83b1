//! Contact and newsletter forms, forwarded to Agent Core.
//!
//! The browser posts JSON and renders the returned `status`; the success
//! notice and its reset are handled client-side.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use curavyom_client::ClientError;
use curavyom_common::forms::{ContactForm, FormStatus, SubscribeRequest};
use serde::Serialize;
use tracing::{info, warn};

use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct FormReply {
    pub status: FormStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FormReply {
    fn ok(status: FormStatus) -> (StatusCode, Json<Self>) {
        (StatusCode::OK, Json(Self { status, message: None }))
    }

    fn failed(err: &ClientError) -> (StatusCode, Json<Self>) {
        let message = match err {
            ClientError::Api { status, .. } => format!("Agent Core responded with {status}"),
            _ => "Agent Core is unreachable".to_string(),
        };
        (StatusCode::BAD_GATEWAY, Json(Self { status: FormStatus::Error, message: Some(message) }))
    }
}

/// POST /contact
pub async fn contact_submit(
    State(state): State<SharedState>,
    Json(form): Json<ContactForm>,
) -> (StatusCode, Json<FormReply>) {
    match state.api.contact(&form).await {
        Ok(()) => {
            info!(email = %form.email, "contact form forwarded");
            FormReply::ok(FormStatus::Success)
        }
        Err(e) => {
            warn!(error = %e, "contact form failed");
            FormReply::failed(&e)
        }
    }
}

/// POST /subscribe. An empty email is a no-op.
pub async fn subscribe_submit(
    State(state): State<SharedState>,
    Json(request): Json<SubscribeRequest>,
) -> (StatusCode, Json<FormReply>) {
    let email = request.email.trim();
    if email.is_empty() {
        return FormReply::ok(FormStatus::Idle);
    }

    match state.api.subscribe(email).await {
        Ok(()) => {
            info!(email, "newsletter subscription forwarded");
            FormReply::ok(FormStatus::Success)
        }
        Err(e) => {
            warn!(error = %e, "newsletter subscription failed");
            FormReply::failed(&e)
        }
    }
}
