//! Playable file selection.
//!
//! Picks the first file, in swarm metadata order, whose name ends with a
//! recognized video extension. First match wins; there is no "largest file"
//! or scoring heuristic, so the same file list always yields the same pick.

use thiserror::Error;

use crate::swarm::SwarmFile;

/// Default playable extensions, in priority order.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".mp4", ".mkv", ".avi", ".webm", ".mov", ".m4v"];

/// Errors that can occur during file selection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No playable file among {0} files")]
    NoPlayableFile(usize),
}

/// Selects the primary playable file of a swarm.
#[derive(Debug, Clone)]
pub struct FileSelector {
    extensions: Vec<String>,
}

impl Default for FileSelector {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()))
    }
}

impl FileSelector {
    /// Create a selector recognizing `extensions` (with or without the dot).
    pub fn new(extensions: impl IntoIterator<Item = String>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|e| {
                let e = e.trim().to_lowercase();
                if e.starts_with('.') {
                    e
                } else {
                    format!(".{}", e)
                }
            })
            .filter(|e| e.len() > 1)
            .collect();
        Self { extensions }
    }

    /// Recognized extensions, normalized.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Whether `name` ends with a recognized extension.
    pub fn is_playable(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }

    /// Pick the first playable file.
    pub fn select<'a>(&self, files: &'a [SwarmFile]) -> Result<&'a SwarmFile, SelectionError> {
        files
            .iter()
            .find(|file| self.is_playable(&file.name))
            .ok_or(SelectionError::NoPlayableFile(files.len()))
    }
}
