use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{GenError, Result};
use crate::types::*;
use crate::Backend;

/// Async client for a project-generation backend.
///
/// Provides REST methods for starting generations, polling job status,
/// listing/reading/writing generated files, per-job file listings and
/// archive download.
///
/// # Example
/// ```no_run
/// use sitegen_client::{GeneratorClient, GenerationRequest};
///
/// # async fn example() -> sitegen_client::Result<()> {
/// let client = GeneratorClient::new("http://127.0.0.1:5000");
/// let reply = client.submit(&GenerationRequest::prompt("portfolio site")).await?;
/// if let Some(id) = reply.job_id() {
///     let status = client.status(id).await?;
///     println!("{}", status.status.as_str());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GeneratorClient {
    http: Client,
    config: ClientConfig,
}

impl GeneratorClient {
    /// Create a new client pointing at the given backend with default timeouts.
    pub fn new(endpoint: impl AsRef<str>) -> Self {
        Self::with_config(ClientConfig::builder().with_base_url(endpoint).build())
    }

    /// Create a client from a full [`ClientConfig`].
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Returns the configured backend URL.
    pub fn endpoint(&self) -> &str {
        &self.config.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn unreachable(&self) -> String {
        format!(
            "Cannot connect to generation backend at {} (is the service running?)",
            self.config.base_url
        )
    }

    async fn send(&self, request: RequestBuilder, context: impl Into<String>) -> Result<Response> {
        let resp = request.send().await.map_err(|e| GenError::Network {
            context: context.into(),
            source: e,
        })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body_text = resp.text().await.unwrap_or_default();
            return Err(GenError::Http {
                status,
                body: error_text(&body_text),
            });
        }
        Ok(resp)
    }

    async fn json(&self, resp: Response, what: &str) -> Result<Value> {
        // A body that fails to decode is a protocol problem, not a lost connection.
        resp.json()
            .await
            .map_err(|e| GenError::InvalidResponse(format!("Failed to parse {} response: {}", what, e)))
    }

    // ── Generation ──────────────────────────────────────────────────

    /// Start a generation. Returns the job acknowledgement, or a mock project
    /// when talking to a relay whose backend is down.
    ///
    /// Blank input is rejected locally without a request.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<SubmitReply> {
        request.validate()?;
        let req = self
            .http
            .post(self.url("/api/generate"))
            .timeout(self.config.submit_timeout)
            .json(request);
        let resp = self.send(req, self.unreachable()).await?;
        let json = self.json(resp, "/api/generate").await?;
        SubmitReply::from_json(json)
    }

    /// Fetch the status record of a job.
    pub async fn status(&self, job_id: &str) -> Result<StatusRecord> {
        debug!(job_id, "checking generation status");
        let req = self
            .http
            .get(self.url(&format!("/api/status/{}", job_id)))
            .timeout(self.config.request_timeout);
        let resp = self.send(req, "Failed to fetch generation status").await?;
        let json = self.json(resp, "status").await?;
        Ok(serde_json::from_value(json)?)
    }

    // ── Files ───────────────────────────────────────────────────────

    /// List the files of the generated project.
    pub async fn list_files(&self) -> Result<Vec<FileDescriptor>> {
        let req = self
            .http
            .get(self.url("/api/files"))
            .timeout(self.config.request_timeout);
        let resp = self.send(req, "Failed to fetch file list").await?;
        let json = self.json(resp, "/api/files").await?;
        files_field(json)
    }

    /// Read a file's content by relative path.
    pub async fn file_content(&self, path: &str) -> Result<String> {
        let req = self
            .http
            .get(self.file_url(path))
            .timeout(self.config.request_timeout);
        let resp = self
            .send(req, format!("Failed to fetch file {}", path))
            .await?;
        let json = self.json(resp, "file").await?;
        json.get("content")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| GenError::InvalidResponse(format!("File {} has no content field", path)))
    }

    /// Overwrite a file with the full given content.
    pub async fn save_file(&self, path: &str, content: &str) -> Result<()> {
        let req = self
            .http
            .put(self.file_url(path))
            .timeout(self.config.request_timeout)
            .json(&serde_json::json!({ "content": content }));
        self.send(req, format!("Failed to save file {}", path))
            .await?;
        Ok(())
    }

    /// Delete a file.
    pub async fn delete_file(&self, path: &str) -> Result<()> {
        let req = self
            .http
            .delete(self.file_url(path))
            .timeout(self.config.request_timeout);
        self.send(req, format!("Failed to delete file {}", path))
            .await?;
        Ok(())
    }

    fn file_url(&self, path: &str) -> String {
        self.url(&format!("/api/file/{}", path.trim_start_matches('/')))
    }

    // ── Per-job artifacts ───────────────────────────────────────────

    /// List the files written for a specific completed job, with sizes.
    pub async fn project_files(&self, job_id: &str) -> Result<Vec<ProjectFileEntry>> {
        let req = self
            .http
            .get(self.url(&format!("/api/project-files/{}", job_id)))
            .timeout(self.config.request_timeout);
        let resp = self
            .send(req, "Failed to fetch project file list")
            .await?;
        let json = self.json(resp, "project-files").await?;
        let files = json
            .get("files")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        Ok(serde_json::from_value(files)?)
    }

    /// Download the project archive (zip) of a completed job.
    pub async fn download(&self, job_id: &str) -> Result<Vec<u8>> {
        let req = self
            .http
            .get(self.url(&format!("/api/download/{}", job_id)))
            .timeout(self.config.download_timeout);
        let resp = self
            .send(req, format!("Failed to download project {}", job_id))
            .await?;
        let bytes = resp.bytes().await.map_err(|e| GenError::Network {
            context: "Failed to read archive bytes".into(),
            source: e,
        })?;
        Ok(bytes.to_vec())
    }

    // ── Health ──────────────────────────────────────────────────────

    /// Check whether the backend answers at all.
    pub async fn health(&self) -> Result<bool> {
        let resp = self
            .http
            .get(self.url("/api/files"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| GenError::Network {
                context: self.unreachable(),
                source: e,
            })?;
        Ok(resp.status().is_success())
    }
}

impl Backend for GeneratorClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<SubmitReply> {
        GeneratorClient::submit(self, request).await
    }

    async fn status(&self, job_id: &str) -> Result<StatusRecord> {
        GeneratorClient::status(self, job_id).await
    }

    async fn list_files(&self) -> Result<Vec<FileDescriptor>> {
        GeneratorClient::list_files(self).await
    }

    async fn file_content(&self, path: &str) -> Result<String> {
        GeneratorClient::file_content(self, path).await
    }

    async fn save_file(&self, path: &str, content: &str) -> Result<()> {
        GeneratorClient::save_file(self, path, content).await
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        GeneratorClient::delete_file(self, path).await
    }
}

/// Pull the `error` field out of a JSON error body, or keep the raw text.
fn error_text(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

fn files_field(json: Value) -> Result<Vec<FileDescriptor>> {
    match json.get("files") {
        Some(files) => Ok(serde_json::from_value(files.clone())?),
        None => Err(GenError::InvalidResponse(
            "File list response missing files".into(),
        )),
    }
}
