//! Relay request and response models

use serde::{Deserialize, Serialize};

use crate::types::FileDescriptor;

/// Body of `POST /api/generate` on the relay
#[derive(Debug, Default, Deserialize)]
pub struct GenerateBody {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl GenerateBody {
    /// Both fields present and non-blank.
    pub fn fields(&self) -> Option<(&str, &str)> {
        let name = self.name.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        Some((name, description))
    }
}

pub use crate::types::project_prompt;

/// Relay answer when the backend accepted the job
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub request_id: String,
    pub status: String,
    pub message: String,
}

/// File listing passthrough
#[derive(Debug, Serialize, Deserialize)]
pub struct FilesResponse {
    pub files: Vec<FileDescriptor>,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
