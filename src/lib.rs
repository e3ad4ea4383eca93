//! # sitegen-client
//!
//! Async Rust client for an AI project-generation backend: submit a project
//! description, poll the job until it finishes, then fetch, edit and save the
//! generated HTML/CSS/JS files.
//!
//! ## Features
//!
//! - **Typed REST client** for the backend's generate/status/file endpoints
//! - **Cancellable poll loop**: constant interval, attempt cap, pause while
//!   hidden, explicit cancellation token
//! - **Single active job** per [`GenerationSession`]; a new submission cancels
//!   the previous loop first
//! - **Best-effort materialization**: one failed file never aborts the rest
//! - **Editor buffers** with a dirty flag and save/discard semantics
//! - **Relay service** that fronts the backend and falls back to a mock project
//!
//! ## Quick Start
//!
//! ```no_run
//! use sitegen_client::{GenerationRequest, GenerationSession, GeneratorClient, PollPolicy};
//! use std::sync::Arc;
//!
//! # async fn example() -> sitegen_client::Result<()> {
//! let client = Arc::new(GeneratorClient::new("http://127.0.0.1:5000"));
//! let session = GenerationSession::new(client, PollPolicy::default());
//!
//! session.submit(GenerationRequest::prompt("a todo list app")).await?;
//! if let Some(result) = session.wait().await {
//!     println!("{:?}", result.state());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod editor;
pub mod error;
pub mod materialize;
pub mod mock;
pub mod poller;
pub mod preview;
pub mod relay;
pub mod session;
pub mod types;

pub use client::GeneratorClient;
pub use config::{ClientConfig, ClientConfigBuilder, PollPolicy};
pub use editor::{Editor, EditorBuffer, FileTree, SelectOutcome};
pub use error::{GenError, Result};
pub use poller::{PollControl, PollOutcome, PollState, PollUpdate};
pub use session::{GenerationProgress, GenerationResult, GenerationSession};
pub use types::{
    FileDescriptor, GeneratedProject, GenerationRequest, JobStatus, LoadedFile,
    ProjectFileEntry, StatusRecord, SubmitAck, SubmitReply,
};

use std::future::Future;

/// The backend operations the poller, session and editor depend on.
///
/// [`GeneratorClient`] is the HTTP implementation. Tests and embedders can
/// supply their own, e.g. to script status sequences.
///
/// # Example
///
/// ```ignore
/// use sitegen_client::*;
///
/// struct AlwaysDone;
///
/// impl Backend for AlwaysDone {
///     async fn submit(&self, _req: &GenerationRequest) -> Result<SubmitReply> {
///         Ok(SubmitReply::Accepted(SubmitAck {
///             job_id: "1".into(),
///             status: "started".into(),
///             message: String::new(),
///         }))
///     }
///     async fn status(&self, _job_id: &str) -> Result<StatusRecord> {
///         Ok(StatusRecord::new(JobStatus::Completed))
///     }
///     // ...
/// }
/// ```
pub trait Backend: Send + Sync {
    /// Start a generation job.
    fn submit(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<SubmitReply>> + Send;

    /// Fetch the current status of a job.
    fn status(&self, job_id: &str) -> impl Future<Output = Result<StatusRecord>> + Send;

    /// List the files of the most recently generated project.
    fn list_files(&self) -> impl Future<Output = Result<Vec<FileDescriptor>>> + Send;

    /// Read one file by its relative path.
    fn file_content(&self, path: &str) -> impl Future<Output = Result<String>> + Send;

    /// Overwrite one file with the full given content.
    fn save_file(&self, path: &str, content: &str) -> impl Future<Output = Result<()>> + Send;

    /// Remove one file.
    fn delete_file(&self, path: &str) -> impl Future<Output = Result<()>> + Send;
}
