use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GenError, Result};

/// A generation request as sent to `POST /api/generate`.
///
/// Serialized untagged, so the wire body is either
/// `{"prompt": ..., "recursion_limit": ...}` or `{"name": ..., "description": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerationRequest {
    /// Free-form prompt, optionally with a step/recursion limit for the agent.
    Prompt {
        prompt: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        recursion_limit: Option<u32>,
    },
    /// Named project brief, as submitted through the relay.
    Project { name: String, description: String },
}

impl GenerationRequest {
    /// Create a free-form prompt request.
    pub fn prompt(prompt: impl Into<String>) -> Self {
        GenerationRequest::Prompt {
            prompt: prompt.into(),
            recursion_limit: None,
        }
    }

    /// Create a named project request.
    pub fn project(name: impl Into<String>, description: impl Into<String>) -> Self {
        GenerationRequest::Project {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Set the recursion limit. Ignored for project requests.
    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        if let GenerationRequest::Prompt {
            ref mut recursion_limit,
            ..
        } = self
        {
            *recursion_limit = Some(limit);
        }
        self
    }

    /// Fold a named project into the single `prompt` field the backend
    /// reads. Prompt requests are returned unchanged.
    pub fn into_prompt(self) -> Self {
        match self {
            GenerationRequest::Project { name, description } => GenerationRequest::Prompt {
                prompt: project_prompt(name.trim(), description.trim()),
                recursion_limit: None,
            },
            prompt => prompt,
        }
    }

    /// Reject blank input before anything touches the network.
    pub fn validate(&self) -> Result<()> {
        match self {
            GenerationRequest::Prompt { prompt, .. } if prompt.trim().is_empty() => Err(
                GenError::Validation("Please enter a project description".into()),
            ),
            GenerationRequest::Project { name, description }
                if name.trim().is_empty() || description.trim().is_empty() =>
            {
                Err(GenError::Validation(
                    "Please fill in both project name and description".into(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Short human-readable title for the request.
    pub fn title(&self) -> String {
        match self {
            GenerationRequest::Project { name, .. } => name.trim().to_string(),
            GenerationRequest::Prompt { prompt, .. } => {
                let first = prompt.trim().lines().next().unwrap_or_default();
                let first = first.strip_prefix(PROJECT_NAME_PREFIX).unwrap_or(first);
                if first.chars().count() > 40 {
                    let cut: String = first.chars().take(40).collect();
                    format!("{}...", cut.trim_end())
                } else {
                    first.to_string()
                }
            }
        }
    }

    /// Longer description used when assembling a project from files.
    pub fn description(&self) -> &str {
        match self {
            GenerationRequest::Project { description, .. } => description,
            GenerationRequest::Prompt { prompt, .. } => prompt,
        }
    }
}

const PROJECT_NAME_PREFIX: &str = "Project Name: ";

/// Prompt text for a named project.
pub fn project_prompt(name: &str, description: &str) -> String {
    format!("{}{}\nDescription: {}", PROJECT_NAME_PREFIX, name, description)
}

/// Acknowledgement of a started generation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitAck {
    pub job_id: String,
    pub status: String,
    pub message: String,
}

/// What `POST /api/generate` answered with.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitReply {
    /// A job was started; poll it by `job_id`.
    Accepted(SubmitAck),
    /// The relay could not reach the backend and produced a project locally.
    Mock(GeneratedProject),
}

impl SubmitReply {
    /// Interpret a generate response body.
    ///
    /// The id may be named `request_id` (relay) or `job_id` (backend). A body
    /// without either but shaped like a project is a mock reply.
    pub fn from_json(json: Value) -> Result<Self> {
        let id = json
            .get("request_id")
            .or_else(|| json.get("job_id"))
            .and_then(|v| v.as_str());

        if let Some(id) = id {
            let text = |key: &str| {
                json.get(key)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };
            return Ok(SubmitReply::Accepted(SubmitAck {
                job_id: id.to_string(),
                status: text("status"),
                message: text("message"),
            }));
        }

        if let Some(err) = json.get("error").and_then(|v| v.as_str()) {
            return Err(GenError::Backend(err.to_string()));
        }

        serde_json::from_value::<GeneratedProject>(json)
            .map(SubmitReply::Mock)
            .map_err(|_| GenError::InvalidResponse("Response missing request_id".into()))
    }

    /// The job id, if a job was started.
    pub fn job_id(&self) -> Option<&str> {
        match self {
            SubmitReply::Accepted(ack) => Some(&ack.job_id),
            SubmitReply::Mock(_) => None,
        }
    }
}

/// Job status as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Started,
    Processing,
    Running,
    Completed,
    Error,
    /// Anything the backend invents later. Treated as still in progress.
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Started => "started",
            JobStatus::Processing => "processing",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "started" => JobStatus::Started,
            "processing" => JobStatus::Processing,
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "error" => JobStatus::Error,
            other => JobStatus::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl Serialize for JobStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(JobStatus::parse(&s))
    }
}

/// Snapshot from `GET /api/status/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Free-text progress line (static backend) or a percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl StatusRecord {
    /// A bare record with the given status, mostly useful in tests.
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            message: None,
            progress: None,
            result: None,
            error: None,
            traceback: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Best human-readable line for the current state.
    ///
    /// Prefers `error` for failed jobs, then `message`, then a textual
    /// `progress` field.
    pub fn display_message(&self) -> Option<String> {
        let error = match self.status {
            JobStatus::Error => self.error.clone(),
            _ => None,
        };
        error
            .or_else(|| self.message.clone().filter(|m| !m.is_empty()))
            .or_else(|| {
                self.progress
                    .as_ref()
                    .and_then(|p| p.as_str())
                    .map(String::from)
            })
    }
}

/// Entry from `GET /api/files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    pub path: String,
    #[serde(rename = "fullPath", default, skip_serializing_if = "Option::is_none")]
    pub full_path: Option<String>,
}

impl FileDescriptor {
    /// Build a descriptor from a relative path; the name is the last segment.
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        Self {
            name,
            path,
            full_path: None,
        }
    }

    /// Lowercased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

/// Entry from `GET /api/project-files/{job_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFileEntry {
    pub path: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub size_human: Option<String>,
}

impl ProjectFileEntry {
    /// The server-provided size label, or one computed from `size`.
    pub fn size_label(&self) -> String {
        match (&self.size_human, self.size) {
            (Some(label), _) => label.clone(),
            (None, Some(bytes)) => human_size(bytes),
            (None, None) => "?".to_string(),
        }
    }
}

/// Format a byte count the way the backend does ("0 B", "1.5 KB").
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// A file whose content has been fetched (or attempted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    pub descriptor: FileDescriptor,
    pub content: String,
    /// False when the fetch failed; `content` is then empty.
    pub loaded: bool,
}

/// A single-page project: one HTML, one CSS and one JS document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedProject {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub css: String,
    #[serde(default)]
    pub js: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl GeneratedProject {
    /// Assemble a project from materialized files.
    ///
    /// The last `.html`, `.css` and `.js` files in listing order win, the
    /// same way repeated fields overwrite each other.
    pub fn from_files(
        name: impl Into<String>,
        description: impl Into<String>,
        files: &[LoadedFile],
    ) -> Self {
        let mut html = String::new();
        let mut css = String::new();
        let mut js = String::new();

        for file in files.iter().filter(|f| f.loaded) {
            match file.descriptor.extension().as_deref() {
                Some("html") => html = file.content.clone(),
                Some("css") => css = file.content.clone(),
                Some("js") => js = file.content.clone(),
                _ => {}
            }
        }

        let now = chrono::Utc::now();
        Self {
            id: now.timestamp_millis().to_string(),
            name: name.into(),
            description: description.into(),
            html,
            css,
            js,
            created_at: now.to_rfc3339(),
            status: Some("completed".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_folds_into_prompt() {
        let folded = GenerationRequest::project(" Todo ", "simple list")
            .into_prompt()
            .with_recursion_limit(25);
        let json = serde_json::to_value(&folded).unwrap();
        assert_eq!(json["prompt"], "Project Name: Todo\nDescription: simple list");
        assert_eq!(json["recursion_limit"], 25);
        assert!(json.get("name").is_none());
        assert_eq!(folded.title(), "Todo");

        let plain = GenerationRequest::prompt("portfolio");
        assert_eq!(plain.clone().into_prompt(), plain);
    }

    #[test]
    fn test_request_wire_shapes() {
        let prompt = GenerationRequest::prompt("todo app").with_recursion_limit(50);
        let json = serde_json::to_value(&prompt).unwrap();
        assert_eq!(json["prompt"], "todo app");
        assert_eq!(json["recursion_limit"], 50);

        let bare = serde_json::to_string(&GenerationRequest::prompt("x")).unwrap();
        assert_eq!(bare, r#"{"prompt":"x"}"#);

        let project = GenerationRequest::project("Todo", "simple list");
        let json = serde_json::to_string(&project).unwrap();
        assert_eq!(json, r#"{"name":"Todo","description":"simple list"}"#);
    }

    #[test]
    fn test_validate_blank_input() {
        assert!(GenerationRequest::prompt("   \n\t").validate().is_err());
        assert!(GenerationRequest::project("Todo", " ").validate().is_err());
        assert!(GenerationRequest::project("", "list").validate().is_err());
        assert!(GenerationRequest::prompt("landing page").validate().is_ok());
    }

    #[test]
    fn test_title_truncates_long_prompts() {
        let req = GenerationRequest::prompt(
            "A colorful landing page for a coffee shop with a menu and a map\nsecond line",
        );
        let title = req.title();
        assert!(title.ends_with("..."));
        assert!(title.chars().count() <= 43);
        assert_eq!(GenerationRequest::project(" Todo ", "x").title(), "Todo");
    }

    #[test]
    fn test_submit_reply_ids() {
        let backend = serde_json::json!({
            "job_id": "abc",
            "message": "Project generation started",
            "status": "started"
        });
        let reply = SubmitReply::from_json(backend).unwrap();
        assert_eq!(reply.job_id(), Some("abc"));

        let relay = serde_json::json!({"request_id": "r-1", "status": "processing", "message": ""});
        assert_eq!(SubmitReply::from_json(relay).unwrap().job_id(), Some("r-1"));
    }

    #[test]
    fn test_submit_reply_error_and_garbage() {
        let err = SubmitReply::from_json(serde_json::json!({"error": "Prompt is required"}));
        assert!(matches!(err, Err(GenError::Backend(m)) if m == "Prompt is required"));

        let garbage = SubmitReply::from_json(serde_json::json!({"ok": true}));
        assert!(matches!(garbage, Err(GenError::InvalidResponse(_))));
    }

    #[test]
    fn test_submit_reply_mock_project() {
        let json = serde_json::json!({
            "id": "1700000000000",
            "name": "Todo",
            "description": "simple list",
            "html": "<html></html>",
            "css": "",
            "js": "",
            "createdAt": "2024-01-01T00:00:00Z"
        });
        match SubmitReply::from_json(json).unwrap() {
            SubmitReply::Mock(project) => assert_eq!(project.name, "Todo"),
            other => panic!("expected mock, got {:?}", other),
        }
    }

    #[test]
    fn test_status_parsing() {
        let record: StatusRecord = serde_json::from_str(
            r#"{"status": "running", "progress": "Processing your request...", "started_at": "2024-01-01T00:00:00"}"#,
        )
        .unwrap();
        assert_eq!(record.status, JobStatus::Running);
        assert!(!record.status.is_terminal());
        assert_eq!(
            record.display_message().as_deref(),
            Some("Processing your request...")
        );

        let weird: StatusRecord = serde_json::from_str(r#"{"status": "queued"}"#).unwrap();
        assert_eq!(weird.status, JobStatus::Other("queued".into()));
        assert_eq!(serde_json::to_string(&weird).unwrap(), r#"{"status":"queued"}"#);
    }

    #[test]
    fn test_error_message_preferred() {
        let record = StatusRecord::new(JobStatus::Error)
            .with_message("Error: model timeout")
            .with_error("model timeout");
        assert_eq!(record.display_message().as_deref(), Some("model timeout"));
    }

    #[test]
    fn test_file_descriptor() {
        let json = r#"{"name": "style.css", "path": "css/style.css", "fullPath": "/srv/out/css/style.css"}"#;
        let file: FileDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(file.full_path.as_deref(), Some("/srv/out/css/style.css"));
        assert_eq!(file.extension().as_deref(), Some("css"));

        let derived = FileDescriptor::from_path("js/app.JS");
        assert_eq!(derived.name, "app.JS");
        assert_eq!(derived.extension().as_deref(), Some("js"));
        assert_eq!(FileDescriptor::from_path("Makefile").extension(), None);
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(1024 * 1024), "1 MB");

        let entry = ProjectFileEntry {
            path: "index.html".into(),
            size: Some(2048),
            size_human: None,
        };
        assert_eq!(entry.size_label(), "2 KB");
    }

    #[test]
    fn test_project_from_files() {
        let file = |path: &str, content: &str, loaded: bool| LoadedFile {
            descriptor: FileDescriptor::from_path(path),
            content: content.to_string(),
            loaded,
        };
        let files = vec![
            file("index.html", "<h1>Hi</h1>", true),
            file("style.css", "", false),
            file("script.js", "console.log(1)", true),
            file("README.md", "# readme", true),
        ];
        let project = GeneratedProject::from_files("Todo", "simple list", &files);
        assert_eq!(project.html, "<h1>Hi</h1>");
        assert_eq!(project.css, "");
        assert_eq!(project.js, "console.log(1)");
        assert_eq!(project.status.as_deref(), Some("completed"));
    }
}
