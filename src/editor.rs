//! File tree and editable buffers over the backend's file endpoints.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{GenError, Result};
use crate::types::FileDescriptor;
use crate::Backend;

/// Two-level view of the generated files: root files, then folders keyed by
/// their first path segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTree {
    pub root: Vec<FileDescriptor>,
    /// Sorted by folder name.
    pub folders: BTreeMap<String, Vec<FileDescriptor>>,
    expanded: BTreeSet<String>,
}

impl FileTree {
    pub fn build(files: &[FileDescriptor]) -> Self {
        let mut tree = FileTree::default();
        for file in files {
            match file.path.trim_start_matches('/').split_once('/') {
                Some((folder, _)) => tree
                    .folders
                    .entry(folder.to_string())
                    .or_default()
                    .push(file.clone()),
                None => tree.root.push(file.clone()),
            }
        }
        tree
    }

    pub fn len(&self) -> usize {
        self.root.len() + self.folders.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Folders start collapsed; the root is always open.
    pub fn is_expanded(&self, folder: &str) -> bool {
        folder.is_empty() || self.expanded.contains(folder)
    }

    /// Flip a folder open/closed. Returns the new state.
    pub fn toggle(&mut self, folder: &str) -> bool {
        if folder.is_empty() {
            return true;
        }
        if !self.expanded.remove(folder) {
            self.expanded.insert(folder.to_string());
            return true;
        }
        false
    }

    /// Files in display order: root files, then each expanded folder.
    pub fn visible_files(&self) -> Vec<&FileDescriptor> {
        let mut out: Vec<&FileDescriptor> = self.root.iter().collect();
        for (folder, files) in &self.folders {
            if self.is_expanded(folder) {
                out.extend(files.iter());
            }
        }
        out
    }
}

/// Editable copy of one file plus its last-saved snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorBuffer {
    pub file: FileDescriptor,
    content: String,
    saved: String,
}

impl EditorBuffer {
    pub fn new(file: FileDescriptor, content: String) -> Self {
        Self {
            file,
            saved: content.clone(),
            content,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn saved(&self) -> &str {
        &self.saved
    }

    /// Replace the buffer text.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Unsaved edits exist iff the text differs from the last save.
    pub fn is_dirty(&self) -> bool {
        self.content != self.saved
    }

    fn mark_saved(&mut self, content: String) {
        self.saved = content;
    }

    pub fn language(&self) -> &'static str {
        language_for(&self.file.name)
    }
}

/// Result of asking the editor to switch files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The new file was fetched and is now the current buffer.
    Loaded,
    /// The caller declined to discard unsaved changes; nothing changed.
    Kept,
}

/// Single-buffer editor bound to a backend.
pub struct Editor<B> {
    backend: Arc<B>,
    current: Option<EditorBuffer>,
}

impl<B: Backend> Editor<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&EditorBuffer> {
        self.current.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.current.as_ref().is_some_and(EditorBuffer::is_dirty)
    }

    /// Switch to `file`.
    ///
    /// With unsaved changes, `confirm_discard` decides; declining keeps the
    /// current buffer untouched. The content is always fetched from the
    /// backend. A failed fetch leaves the current buffer in place.
    pub async fn select<F>(&mut self, file: &FileDescriptor, confirm_discard: F) -> Result<SelectOutcome>
    where
        F: FnOnce(&EditorBuffer) -> bool,
    {
        if let Some(buffer) = self.current.as_ref().filter(|b| b.is_dirty()) {
            if !confirm_discard(buffer) {
                return Ok(SelectOutcome::Kept);
            }
        }

        let content = self.backend.file_content(&file.path).await.map_err(|e| {
            warn!(path = %file.path, error = %e, "error loading file");
            e
        })?;
        self.current = Some(EditorBuffer::new(file.clone(), content));
        Ok(SelectOutcome::Loaded)
    }

    /// Replace the current buffer's text. Returns the new dirty flag.
    pub fn edit(&mut self, content: impl Into<String>) -> Result<bool> {
        let buffer = self.current_mut()?;
        buffer.set_content(content);
        Ok(buffer.is_dirty())
    }

    /// Write the whole buffer back. Dirty is cleared only on success.
    pub async fn save(&mut self) -> Result<()> {
        let (path, content) = {
            let buffer = self.current_mut()?;
            (buffer.file.path.clone(), buffer.content.clone())
        };
        match self.backend.save_file(&path, &content).await {
            Ok(()) => {
                info!(%path, "file saved");
                if let Some(buffer) = self.current.as_mut() {
                    buffer.mark_saved(content);
                }
                Ok(())
            }
            Err(e) => {
                warn!(%path, error = %e, "error saving file");
                Err(e)
            }
        }
    }

    /// Delete the current file on the backend and close its buffer.
    pub async fn delete(&mut self) -> Result<FileDescriptor> {
        let path = self.current_mut()?.file.path.clone();
        self.backend.delete_file(&path).await?;
        info!(%path, "file deleted");
        self.current
            .take()
            .map(|b| b.file)
            .ok_or_else(|| GenError::Validation("No file selected".into()))
    }

    /// Drop the current buffer without saving.
    pub fn close(&mut self) -> Option<EditorBuffer> {
        self.current.take()
    }

    fn current_mut(&mut self) -> Result<&mut EditorBuffer> {
        self.current
            .as_mut()
            .ok_or_else(|| GenError::Validation("No file selected".into()))
    }
}

/// Highlighting language for a file name, by extension.
pub fn language_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" => "python",
        "html" => "html",
        "css" => "css",
        "json" => "json",
        "md" => "markdown",
        "xml" => "xml",
        "yaml" | "yml" => "yaml",
        _ => "plaintext",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> Vec<FileDescriptor> {
        paths.iter().map(|p| FileDescriptor::from_path(*p)).collect()
    }

    #[test]
    fn test_tree_grouping() {
        let tree = FileTree::build(&files(&[
            "index.html",
            "js/app.js",
            "css/style.css",
            "css/vendor/reset.css",
            "script.js",
        ]));
        assert_eq!(tree.root.len(), 2);
        assert_eq!(
            tree.folders.keys().collect::<Vec<_>>(),
            vec!["css", "js"]
        );
        assert_eq!(tree.folders["css"].len(), 2);
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_tree_expansion() {
        let mut tree = FileTree::build(&files(&["index.html", "css/style.css"]));
        assert!(tree.is_expanded(""));
        assert!(!tree.is_expanded("css"));
        assert_eq!(tree.visible_files().len(), 1);

        assert!(tree.toggle("css"));
        assert_eq!(tree.visible_files().len(), 2);
        assert!(!tree.toggle("css"));
        assert!(tree.toggle(""));
    }

    #[test]
    fn test_buffer_dirty_flag() {
        let mut buffer = EditorBuffer::new(FileDescriptor::from_path("a.css"), "body{}".into());
        assert!(!buffer.is_dirty());
        buffer.set_content("body{color:red}");
        assert!(buffer.is_dirty());
        buffer.set_content("body{}");
        assert!(!buffer.is_dirty());
        assert_eq!(buffer.language(), "css");
    }

    #[test]
    fn test_language_for() {
        assert_eq!(language_for("app.TSX"), "typescript");
        assert_eq!(language_for("config.yml"), "yaml");
        assert_eq!(language_for("Makefile"), "plaintext");
        assert_eq!(language_for("index.html"), "html");
    }
}
