//! Status poll loop for a single generation job.
//!
//! The loop issues one status request at a time, sleeping a constant
//! interval between them, until the backend reports a terminal status, the
//! attempt budget runs out, or the caller cancels. A visibility signal pauses
//! the loop without cancelling it.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PollPolicy;
use crate::types::{JobStatus, StatusRecord};
use crate::Backend;

/// Canned progress lines shown while the backend has nothing to say.
pub const PROGRESS_MESSAGES: [&str; 8] = [
    "AI is analyzing your requirements...",
    "Planning the project structure...",
    "Designing the user interface...",
    "Writing HTML structure...",
    "Crafting beautiful CSS styles...",
    "Adding interactive JavaScript...",
    "Optimizing and finalizing...",
    "Almost ready...",
];

pub const TIMEOUT_MESSAGE: &str = "Generation timeout - please try again";
pub const CONNECTION_LOST_MESSAGE: &str =
    "Connection lost - please check if the backend is running and try again";
pub const NOT_FOUND_MESSAGE: &str = "Generation request not found";
pub const CHECKING_MESSAGE: &str = "Checking status...";

/// Lifecycle of a generation as seen by the client.
///
/// `Idle -> Processing -> {Completed, Error, Timeout}`. Only `Timeout` is
/// decided locally; `Completed` and `Error` come from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Processing,
    Completed,
    Error,
    Timeout,
}

impl PollState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollState::Idle => "idle",
            PollState::Processing => "processing",
            PollState::Completed => "completed",
            PollState::Error => "error",
            PollState::Timeout => "timeout",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollState::Completed | PollState::Error | PollState::Timeout
        )
    }
}

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The backend reported `completed`.
    Completed(StatusRecord),
    /// The backend reported `error`, or the job is unknown to it.
    Failed {
        message: String,
        traceback: Option<String>,
    },
    /// The attempt budget ran out without a terminal status.
    TimedOut {
        message: String,
        /// The last attempt failed at the transport level.
        connection_lost: bool,
    },
    /// The loop was cancelled by its owner.
    Cancelled,
}

impl PollOutcome {
    pub fn state(&self) -> PollState {
        match self {
            PollOutcome::Completed(_) => PollState::Completed,
            PollOutcome::Failed { .. } => PollState::Error,
            PollOutcome::TimedOut { .. } => PollState::Timeout,
            PollOutcome::Cancelled => PollState::Idle,
        }
    }

    /// User-facing line for the outcome.
    pub fn message(&self) -> String {
        match self {
            PollOutcome::Completed(record) => record
                .display_message()
                .unwrap_or_else(|| "Project generation completed successfully!".to_string()),
            PollOutcome::Failed { message, .. } | PollOutcome::TimedOut { message, .. } => {
                message.clone()
            }
            PollOutcome::Cancelled => "Generation cancelled".to_string(),
        }
    }
}

/// Progress report emitted after every status check.
#[derive(Debug, Clone, PartialEq)]
pub struct PollUpdate {
    /// Status checks made so far, including this one.
    pub attempt: u32,
    pub state: PollState,
    pub message: String,
    /// Estimated completion percentage, 0-100.
    pub progress: u8,
}

/// Cancellation and visibility handles for one poll loop.
///
/// Clone the token or the visibility sender before handing the control to
/// the loop to keep steering it from outside.
#[derive(Debug, Clone)]
pub struct PollControl {
    pub cancel: CancellationToken,
    pub visible: watch::Receiver<bool>,
}

impl PollControl {
    pub fn new(cancel: CancellationToken, visible: watch::Receiver<bool>) -> Self {
        Self { cancel, visible }
    }

    /// A control that is always visible, with a fresh token.
    pub fn detached() -> (Self, CancellationToken) {
        let token = CancellationToken::new();
        let (tx, rx) = watch::channel(true);
        // Keep the receiver usable after the sender is gone.
        drop(tx);
        (Self::new(token.clone(), rx), token)
    }

    /// Wait until visible. Returns false if cancelled first.
    async fn wait_visible(&mut self) -> bool {
        loop {
            if self.cancel.is_cancelled() {
                return false;
            }
            if *self.visible.borrow_and_update() {
                return true;
            }
            debug!("poll loop paused while hidden");
            tokio::select! {
                _ = self.cancel.cancelled() => return false,
                changed = self.visible.changed() => {
                    // Sender gone while hidden: nobody can ever reveal us.
                    if changed.is_err() {
                        return false;
                    }
                }
            }
        }
    }
}

/// Percentage heuristic for in-progress updates.
pub fn estimate_progress(attempts: u32) -> u8 {
    20u32.saturating_add(attempts.saturating_mul(3)).min(90) as u8
}

/// Canned message for a given progress percentage.
pub fn progress_message(progress: u8) -> &'static str {
    let idx = (progress as usize / 12).min(PROGRESS_MESSAGES.len() - 1);
    PROGRESS_MESSAGES[idx]
}

/// Poll `job_id` until it reaches a terminal state.
///
/// The first check is issued immediately. `on_update` runs after every
/// check with the in-progress state; it is not called for the terminal
/// outcome, which is returned instead.
pub async fn poll_job<B, F>(
    backend: &B,
    job_id: &str,
    policy: &PollPolicy,
    mut control: PollControl,
    mut on_update: F,
) -> PollOutcome
where
    B: Backend,
    F: FnMut(PollUpdate) + Send,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts: u32 = 0;

    loop {
        if !control.wait_visible().await {
            info!(job_id, attempts, "poll loop cancelled");
            return PollOutcome::Cancelled;
        }

        let result = tokio::select! {
            _ = control.cancel.cancelled() => {
                info!(job_id, attempts, "poll loop cancelled mid-request");
                return PollOutcome::Cancelled;
            }
            result = backend.status(job_id) => result,
        };

        let mut connection_lost = false;
        let update = match result {
            Ok(record) => match record.status {
                JobStatus::Completed => {
                    info!(job_id, attempts = attempts + 1, "generation completed");
                    return PollOutcome::Completed(record);
                }
                JobStatus::Error => {
                    let message = record
                        .error
                        .clone()
                        .filter(|e| !e.is_empty())
                        .or_else(|| record.message.clone().filter(|m| !m.is_empty()))
                        .unwrap_or_else(|| "Generation failed".to_string());
                    warn!(job_id, %message, "backend reported generation error");
                    return PollOutcome::Failed {
                        message,
                        traceback: record.traceback,
                    };
                }
                _ => {
                    let progress = estimate_progress(attempts);
                    let message = record
                        .display_message()
                        .unwrap_or_else(|| progress_message(progress).to_string());
                    PollUpdate {
                        attempt: attempts + 1,
                        state: PollState::Processing,
                        message,
                        progress,
                    }
                }
            },
            Err(e) if e.is_not_found() => {
                warn!(job_id, "backend does not know this job");
                return PollOutcome::Failed {
                    message: NOT_FOUND_MESSAGE.to_string(),
                    traceback: None,
                };
            }
            Err(e) => {
                connection_lost = e.is_transport();
                warn!(job_id, error = %e, "status check failed");
                PollUpdate {
                    attempt: attempts + 1,
                    state: PollState::Processing,
                    message: CHECKING_MESSAGE.to_string(),
                    progress: estimate_progress(attempts),
                }
            }
        };

        attempts += 1;
        on_update(update);

        if attempts >= max_attempts {
            let message = if connection_lost {
                CONNECTION_LOST_MESSAGE
            } else {
                TIMEOUT_MESSAGE
            };
            warn!(job_id, attempts, "poll budget exhausted");
            return PollOutcome::TimedOut {
                message: message.to_string(),
                connection_lost,
            };
        }

        tokio::select! {
            _ = control.cancel.cancelled() => {
                info!(job_id, attempts, "poll loop cancelled");
                return PollOutcome::Cancelled;
            }
            _ = tokio::time::sleep(policy.interval) => {}
        }
    }
}
