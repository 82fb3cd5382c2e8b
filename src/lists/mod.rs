//! Option List Store
//!
//! Named option lists live as JSON files on disk, one list per file
//! (`<name>.json`). Each file holds an array of entries with a display
//! name and an optional emoji to seed as the vote target.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One entry in a stored option list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedOption {
    /// Display name, posted verbatim as the option message
    pub name: String,
    /// Emoji short name to seed on the posted message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

/// Errors from loading a named list
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("list {0:?} not found")]
    NotFound(String),

    #[error("list {name:?} is not valid JSON: {source}")]
    Invalid {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("list {name:?} could not be read: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Read access to named option lists
pub trait ListStore: Send + Sync {
    /// Load a list by name
    fn load(&self, name: &str) -> Result<Vec<ListedOption>, ListError>;
}

/// List store backed by a directory of `<name>.json` files
pub struct FileListStore {
    dir: PathBuf,
}

impl FileListStore {
    /// Create a store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ListStore for FileListStore {
    fn load(&self, name: &str) -> Result<Vec<ListedOption>, ListError> {
        // List names come straight from chat input; keep them from
        // escaping the list directory.
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(ListError::NotFound(name.to_string()));
        }

        let path = self.dir.join(format!("{name}.json"));
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ListError::NotFound(name.to_string()));
            }
            Err(e) => {
                return Err(ListError::Io {
                    name: name.to_string(),
                    source: e,
                });
            }
        };

        serde_json::from_str(&raw).map_err(|e| ListError::Invalid {
            name: name.to_string(),
            source: e,
        })
    }
}
