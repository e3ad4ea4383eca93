//! Fetching the generated files once a job has completed.

use std::path::{Component, Path, PathBuf};

use futures_util::future::join_all;
use tracing::{info, warn};

use crate::error::{GenError, Result};
use crate::types::{FileDescriptor, LoadedFile};
use crate::Backend;

/// Fetch the file listing, then every file's content.
///
/// Contents are fetched concurrently and returned in listing order. A failed
/// fetch is logged and leaves that file empty with `loaded = false`; only a
/// failed listing fails the whole step.
pub async fn materialize<B: Backend>(backend: &B) -> Result<Vec<LoadedFile>> {
    let files = backend.list_files().await.map_err(|e| {
        warn!(error = %e, "file listing failed");
        GenError::Backend(format!("Failed to retrieve generated files: {}", e))
    })?;
    let loaded = load_all(backend, files).await;
    info!(
        total = loaded.len(),
        failed = loaded.iter().filter(|f| !f.loaded).count(),
        "materialized generated files"
    );
    Ok(loaded)
}

/// Fetch the content of each descriptor, tolerating individual failures.
pub async fn load_all<B: Backend>(backend: &B, files: Vec<FileDescriptor>) -> Vec<LoadedFile> {
    let fetches = files.iter().map(|f| backend.file_content(&f.path));
    let contents = join_all(fetches).await;

    files
        .into_iter()
        .zip(contents)
        .map(|(descriptor, content)| match content {
            Ok(content) => LoadedFile {
                descriptor,
                content,
                loaded: true,
            },
            Err(e) => {
                warn!(path = %descriptor.path, error = %e, "error fetching file");
                LoadedFile {
                    descriptor,
                    content: String::new(),
                    loaded: false,
                }
            }
        })
        .collect()
}

/// Write loaded files under `dir`, creating subdirectories as needed.
///
/// Files that failed to load are skipped. Paths that would escape `dir`
/// (absolute, or containing `..`) are rejected before anything is written.
/// Returns the written paths.
pub fn write_files(dir: &Path, files: &[LoadedFile]) -> Result<Vec<PathBuf>> {
    let planned = files
        .iter()
        .filter(|f| f.loaded)
        .map(|f| safe_relative(&f.descriptor.path).map(|rel| (dir.join(rel), f)))
        .collect::<Result<Vec<_>>>()?;

    let mut written = Vec::new();
    for (target, file) in planned {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, &file.content)?;
        written.push(target);
    }
    Ok(written)
}

fn safe_relative(path: &str) -> Result<PathBuf> {
    let candidate = Path::new(path);
    let escapes = candidate
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || path.is_empty() {
        return Err(GenError::Validation(format!(
            "Refusing to write outside the output directory: {}",
            path
        )));
    }
    Ok(candidate.to_path_buf())
}
