#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use sitegen_client::*;

/// One scripted answer to a status check.
#[derive(Debug, Clone)]
pub enum Step {
    Processing,
    Completed,
    Failed(String),
    NotFound,
    /// The backend answered with something unreadable.
    Garbled,
}

impl Step {
    fn answer(&self) -> Result<StatusRecord> {
        match self {
            Step::Processing => Ok(StatusRecord::new(JobStatus::Processing)),
            Step::Completed => Ok(StatusRecord::new(JobStatus::Completed)
                .with_message("Project generation completed successfully!")),
            Step::Failed(msg) => Ok(StatusRecord::new(JobStatus::Error).with_error(msg.clone())),
            Step::NotFound => Err(GenError::Http {
                status: 404,
                body: "Job not found".into(),
            }),
            Step::Garbled => Err(GenError::InvalidResponse("Failed to parse status".into())),
        }
    }
}

/// In-memory backend that replays a status script and counts every call.
///
/// Once the script is exhausted it keeps answering with `fallback`.
pub struct ScriptedBackend {
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    mock_reply: Option<GeneratedProject>,
    files: Mutex<HashMap<String, Option<String>>>,
    order: Vec<String>,
    submit_delay: Option<Duration>,
    status_delay: Option<Duration>,
    pub fail_save: AtomicBool,
    pub fail_listing: AtomicBool,
    pub fail_submit: AtomicBool,
    submits: AtomicUsize,
    status_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    list_calls: AtomicUsize,
    polled_ids: Mutex<Vec<String>>,
    saved: Mutex<Vec<(String, String)>>,
    deleted: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(steps: Vec<Step>, fallback: Step) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback,
            mock_reply: None,
            files: Mutex::new(HashMap::new()),
            order: Vec::new(),
            submit_delay: None,
            status_delay: None,
            fail_save: AtomicBool::new(false),
            fail_listing: AtomicBool::new(false),
            fail_submit: AtomicBool::new(false),
            submits: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            polled_ids: Mutex::new(Vec::new()),
            saved: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    /// Never finishes.
    pub fn processing_forever() -> Self {
        Self::new(Vec::new(), Step::Processing)
    }

    /// `n` in-progress answers, then completion.
    pub fn completes_after(n: usize) -> Self {
        let mut steps = vec![Step::Processing; n];
        steps.push(Step::Completed);
        Self::new(steps, Step::Completed)
    }

    /// Serve a file; `None` content makes its fetch fail.
    pub fn with_file(mut self, path: &str, content: Option<&str>) -> Self {
        self.order.push(path.to_string());
        self.files
            .get_mut()
            .unwrap()
            .insert(path.to_string(), content.map(String::from));
        self
    }

    /// Answer submissions with a mock project instead of a job id.
    pub fn with_mock_reply(mut self, project: GeneratedProject) -> Self {
        self.mock_reply = Some(project);
        self
    }

    /// Make every submission take `delay` before answering.
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    /// Make every status check take `delay` before answering.
    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Most status checks that were ever outstanding at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn polled_ids(&self) -> Vec<String> {
        self.polled_ids.lock().unwrap().clone()
    }

    pub fn saved(&self) -> Vec<(String, String)> {
        self.saved.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

impl Backend for ScriptedBackend {
    async fn submit(&self, _request: &GenerationRequest) -> Result<SubmitReply> {
        let n = self.submits.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(GenError::Http {
                status: 503,
                body: "Backend service unavailable".into(),
            });
        }
        if let Some(project) = &self.mock_reply {
            return Ok(SubmitReply::Mock(project.clone()));
        }
        Ok(SubmitReply::Accepted(SubmitAck {
            job_id: format!("job-{}", n),
            status: "started".into(),
            message: "Generation started".into(),
        }))
    }

    async fn status(&self, job_id: &str) -> Result<StatusRecord> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.polled_ids.lock().unwrap().push(job_id.to_string());
        if let Some(delay) = self.status_delay {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        step.answer()
    }

    async fn list_files(&self) -> Result<Vec<FileDescriptor>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(GenError::Http {
                status: 500,
                body: "listing failed".into(),
            });
        }
        let files = self.files.lock().unwrap();
        Ok(self
            .order
            .iter()
            .filter(|p| files.contains_key(*p))
            .map(|p| FileDescriptor::from_path(p.as_str()))
            .collect())
    }

    async fn file_content(&self, path: &str) -> Result<String> {
        match self.files.lock().unwrap().get(path) {
            Some(Some(content)) => Ok(content.clone()),
            Some(None) => Err(GenError::Http {
                status: 500,
                body: "read failed".into(),
            }),
            None => Err(GenError::Http {
                status: 404,
                body: "File not found".into(),
            }),
        }
    }

    async fn save_file(&self, path: &str, content: &str) -> Result<()> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(GenError::Http {
                status: 500,
                body: "disk full".into(),
            });
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), Some(content.to_string()));
        self.saved
            .lock()
            .unwrap()
            .push((path.to_string(), content.to_string()));
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        self.files.lock().unwrap().remove(path);
        self.deleted.lock().unwrap().push(path.to_string());
        Ok(())
    }
}

/// Address of a local port with nothing listening on it.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}
