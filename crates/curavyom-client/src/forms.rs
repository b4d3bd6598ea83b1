//! Submission status for the contact and newsletter forms.
//!
//! `idle → loading → success | error`. A success notice falls back to
//! `idle` after a few seconds; an error stays until the next attempt.

use crate::pulse::DelayedAction;
use curavyom_common::forms::FormStatus;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

pub const SUCCESS_RESET: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct FormTracker {
    status: Arc<watch::Sender<FormStatus>>,
    reset: DelayedAction,
}

impl Default for FormTracker {
    fn default() -> Self {
        Self::new(SUCCESS_RESET)
    }
}

impl FormTracker {
    pub fn new(reset_after: Duration) -> Self {
        let (tx, _rx) = watch::channel(FormStatus::Idle);
        Self { status: Arc::new(tx), reset: DelayedAction::new(reset_after) }
    }

    pub fn status(&self) -> FormStatus {
        *self.status.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<FormStatus> {
        self.status.subscribe()
    }

    /// Run one submission. Returns `None` without calling `submit` while a
    /// previous submission is still loading.
    pub async fn submit<F, Fut, E>(&self, form: &str, submit: F) -> Option<FormStatus>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: std::fmt::Display,
    {
        if self.status().is_busy() {
            return None;
        }
        self.reset.cancel();
        self.status.send_replace(FormStatus::Loading);

        let next = match submit().await {
            Ok(()) => {
                info!(form, "form submitted");
                FormStatus::Success
            }
            Err(e) => {
                warn!(form, error = %e, "form submission failed");
                FormStatus::Error
            }
        };
        self.status.send_replace(next);

        if next == FormStatus::Success {
            let status = self.status.clone();
            self.reset.schedule(move || {
                status.send_if_modified(|s| {
                    let was_success = *s == FormStatus::Success;
                    if was_success {
                        *s = FormStatus::Idle;
                    }
                    was_success
                });
            });
        }
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_to_idle_after_five_seconds() {
        let tracker = FormTracker::default();
        let status = tracker.submit("contact", || async { Ok::<(), String>(()) }).await;
        assert_eq!(status, Some(FormStatus::Success));

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(tracker.status(), FormStatus::Success);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(tracker.status(), FormStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_sticks() {
        let tracker = FormTracker::default();
        let status = tracker
            .submit("subscribe", || async { Err::<(), _>("503 Service Unavailable") })
            .await;
        assert_eq!(status, Some(FormStatus::Error));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(tracker.status(), FormStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_attempt_cancels_pending_reset() {
        let tracker = FormTracker::default();
        tracker.submit("contact", || async { Ok::<(), String>(()) }).await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        tracker.submit("contact", || async { Err::<(), _>("boom") }).await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(tracker.status(), FormStatus::Error);
    }

    #[tokio::test]
    async fn test_watch_sees_loading() {
        let tracker = FormTracker::default();
        let mut rx = tracker.watch();
        let (gate_tx, gate_rx) = tokio::sync::oneshot::channel::<()>();

        let run = tracker.submit("contact", || async move {
            gate_rx.await.ok();
            Ok::<(), String>(())
        });
        let observe = async {
            rx.changed().await.unwrap();
            assert_eq!(*rx.borrow_and_update(), FormStatus::Loading);
            gate_tx.send(()).ok();
        };
        let (status, ()) = tokio::join!(run, observe);
        assert_eq!(status, Some(FormStatus::Success));
    }
}
