use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::PollPolicy;
use crate::error::{GenError, Result};
use crate::materialize::materialize;
use crate::poller::{
    poll_job, PollControl, PollOutcome, PollState, PollUpdate, PROGRESS_MESSAGES,
};
use crate::types::{
    GeneratedProject, GenerationRequest, LoadedFile, StatusRecord, SubmitReply,
};
use crate::Backend;

/// Observable state of the session's current generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationProgress {
    /// Id of the job being polled, if any.
    pub request_id: Option<String>,
    pub status: PollState,
    pub message: String,
    /// Estimated completion percentage, 0-100.
    pub progress: u8,
}

impl Default for GenerationProgress {
    fn default() -> Self {
        Self {
            request_id: None,
            status: PollState::Idle,
            message: String::new(),
            progress: 0,
        }
    }
}

/// Final result of one submission's poll loop.
#[derive(Debug, Clone)]
pub enum GenerationResult {
    /// The backend finished and the files were fetched.
    Completed {
        record: StatusRecord,
        files: Vec<LoadedFile>,
        project: GeneratedProject,
    },
    /// The backend reported an error, or the files could not be listed.
    Failed {
        message: String,
        traceback: Option<String>,
    },
    /// The attempt budget ran out.
    TimedOut { message: String },
    /// Cancelled by a newer submission or an explicit cancel.
    Cancelled,
}

impl GenerationResult {
    pub fn state(&self) -> PollState {
        match self {
            GenerationResult::Completed { .. } => PollState::Completed,
            GenerationResult::Failed { .. } => PollState::Error,
            GenerationResult::TimedOut { .. } => PollState::Timeout,
            GenerationResult::Cancelled => PollState::Idle,
        }
    }
}

struct ActiveJob {
    job_id: String,
    cancel: CancellationToken,
    handle: Option<JoinHandle<GenerationResult>>,
}

/// One user's generation session: at most one job is polled at a time.
///
/// The session owns the active job id. Submitting again cancels the previous
/// poll loop before the new request goes out. Progress is published on a
/// `watch` channel so any number of views can follow it.
pub struct GenerationSession<B> {
    backend: Arc<B>,
    policy: PollPolicy,
    progress: Arc<watch::Sender<GenerationProgress>>,
    visible: watch::Sender<bool>,
    active: Mutex<Option<ActiveJob>>,
    /// Bumped on every submission; only the latest one may start a loop.
    submissions: AtomicU64,
    projects: Arc<Mutex<Vec<GeneratedProject>>>,
}

impl<B: Backend + 'static> GenerationSession<B> {
    pub fn new(backend: Arc<B>, policy: PollPolicy) -> Self {
        let (progress, _) = watch::channel(GenerationProgress::default());
        let (visible, _) = watch::channel(true);
        Self {
            backend,
            policy,
            progress: Arc::new(progress),
            visible,
            active: Mutex::new(None),
            submissions: AtomicU64::new(0),
            projects: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Current progress snapshot.
    pub fn progress(&self) -> GenerationProgress {
        self.progress.borrow().clone()
    }

    /// Subscribe to progress changes.
    pub fn subscribe(&self) -> watch::Receiver<GenerationProgress> {
        self.progress.subscribe()
    }

    /// True while a poll loop is running.
    pub fn is_generating(&self) -> bool {
        self.progress.borrow().status == PollState::Processing
    }

    /// Id of the job currently owned by the session.
    pub fn active_job_id(&self) -> Option<String> {
        self.lock_active().as_ref().map(|a| a.job_id.clone())
    }

    /// Projects produced so far, newest first.
    pub fn projects(&self) -> Vec<GeneratedProject> {
        match self.projects.lock() {
            Ok(p) => p.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Submit a generation request.
    ///
    /// Blank input is rejected without a network call and without touching
    /// the session. Any running poll loop is cancelled first. If the request
    /// then fails, the error is returned; progress is reset to idle when a
    /// loop was cancelled and left untouched otherwise.
    ///
    /// When several submissions overlap, only the most recent one starts a
    /// poll loop. Earlier replies are returned to their callers but ignored.
    pub async fn submit(&self, request: GenerationRequest) -> Result<SubmitReply> {
        request.validate()?;
        let ticket = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        let stopped = self.stop_loop();

        let reply = match self.backend.submit(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "failed to start generation");
                if stopped && self.is_latest(ticket) {
                    self.progress.send_replace(GenerationProgress::default());
                }
                return Err(e);
            }
        };

        if !self.is_latest(ticket) {
            info!(job_id = ?reply.job_id(), "submission superseded before it was accepted");
            return Ok(reply);
        }

        match &reply {
            SubmitReply::Accepted(ack) => {
                info!(job_id = %ack.job_id, "generation started");
                self.start_polling(ack.job_id.clone(), request);
            }
            SubmitReply::Mock(project) => {
                info!(name = %project.name, "backend unavailable, received mock project");
                self.push_project(project.clone());
                self.progress.send_replace(GenerationProgress::default());
            }
        }
        Ok(reply)
    }

    fn is_latest(&self, ticket: u64) -> bool {
        self.submissions.load(Ordering::SeqCst) == ticket
    }

    fn start_polling(&self, job_id: String, request: GenerationRequest) {
        let cancel = CancellationToken::new();
        let control = PollControl::new(cancel.clone(), self.visible.subscribe());

        // Held until the new job is installed so no other loop slips in.
        let mut active = self.lock_active();
        if let Some(previous) = active.take() {
            info!(job_id = %previous.job_id, "cancelling poll loop");
            previous.cancel.cancel();
        }

        self.progress.send_replace(GenerationProgress {
            request_id: Some(job_id.clone()),
            status: PollState::Processing,
            message: PROGRESS_MESSAGES[0].to_string(),
            progress: 20,
        });

        let backend = Arc::clone(&self.backend);
        let policy = self.policy.clone();
        let progress = Arc::clone(&self.progress);
        let projects = Arc::clone(&self.projects);
        let id = job_id.clone();
        let superseded = cancel.clone();

        let handle = tokio::spawn(async move {
            let on_update = {
                let progress = Arc::clone(&progress);
                let superseded = superseded.clone();
                move |update: PollUpdate| {
                    // A newer submission owns the progress channel now.
                    if superseded.is_cancelled() {
                        return;
                    }
                    progress.send_modify(|p| {
                        p.status = update.state;
                        p.message = update.message;
                        p.progress = p.progress.max(update.progress);
                    });
                }
            };
            let outcome = poll_job(backend.as_ref(), &id, &policy, control, on_update).await;
            let result = finish(backend.as_ref(), outcome, &request).await;

            if let GenerationResult::Completed { project, .. } = &result {
                match projects.lock() {
                    Ok(mut p) => p.insert(0, project.clone()),
                    Err(poisoned) => poisoned.into_inner().insert(0, project.clone()),
                }
            }
            if !superseded.is_cancelled() && !matches!(result, GenerationResult::Cancelled) {
                progress.send_modify(|p| apply_result(p, &result));
            }
            result
        });

        *active = Some(ActiveJob {
            job_id,
            cancel,
            handle: Some(handle),
        });
    }

    /// Wait for the active poll loop to finish and return its result.
    ///
    /// Returns `None` when nothing is running or another caller already took
    /// the result.
    pub async fn wait(&self) -> Option<GenerationResult> {
        let handle = self.lock_active().as_mut().and_then(|a| a.handle.take())?;
        match handle.await {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(error = %e, "poll task ended abnormally");
                Some(GenerationResult::Cancelled)
            }
        }
    }

    /// Cancel the active poll loop, if any, and reset progress to idle.
    pub fn cancel(&self) {
        if self.stop_loop() {
            self.progress.send_replace(GenerationProgress::default());
        }
    }

    fn stop_loop(&self) -> bool {
        match self.lock_active().take() {
            Some(active) => {
                info!(job_id = %active.job_id, "cancelling poll loop");
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// The view went out of sight: stop issuing status requests.
    pub fn hide(&self) {
        self.visible.send_replace(false);
    }

    /// The view is back: resume polling if a job is still active.
    pub fn show(&self) {
        self.visible.send_replace(true);
    }

    pub fn is_visible(&self) -> bool {
        *self.visible.borrow()
    }

    fn push_project(&self, project: GeneratedProject) {
        match self.projects.lock() {
            Ok(mut p) => p.insert(0, project),
            Err(poisoned) => poisoned.into_inner().insert(0, project),
        }
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<ActiveJob>> {
        match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<B> Drop for GenerationSession<B> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(active) = active.take() {
                active.cancel.cancel();
            }
        }
    }
}

/// Turn a poll outcome into a session result, materializing on completion.
async fn finish<B: Backend>(
    backend: &B,
    outcome: PollOutcome,
    request: &GenerationRequest,
) -> GenerationResult {
    match outcome {
        PollOutcome::Completed(record) => match materialize(backend).await {
            Ok(files) => {
                let project =
                    GeneratedProject::from_files(request.title(), request.description(), &files);
                GenerationResult::Completed {
                    record,
                    files,
                    project,
                }
            }
            Err(e) => GenerationResult::Failed {
                message: match e {
                    GenError::Backend(m) => m,
                    other => other.to_string(),
                },
                traceback: None,
            },
        },
        PollOutcome::Failed { message, traceback } => {
            GenerationResult::Failed { message, traceback }
        }
        PollOutcome::TimedOut { message, .. } => GenerationResult::TimedOut { message },
        PollOutcome::Cancelled => GenerationResult::Cancelled,
    }
}

fn apply_result(progress: &mut GenerationProgress, result: &GenerationResult) {
    progress.status = result.state();
    match result {
        GenerationResult::Completed { record, .. } => {
            progress.progress = 100;
            progress.message = record
                .display_message()
                .unwrap_or_else(|| "Project generation completed successfully!".to_string());
        }
        GenerationResult::Failed { message, .. } | GenerationResult::TimedOut { message } => {
            progress.message = message.clone();
        }
        GenerationResult::Cancelled => {}
    }
}
