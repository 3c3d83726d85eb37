//! Error types for the tree combo box.

use std::path::PathBuf;

use crate::tree_data::NodeId;

/// Result type alias for tree combo box operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised at the boundaries of the widget: building tree data and
/// loading datasets or configuration. Filtering and resolution never fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A child was added under a parent handle that is not part of the tree.
    #[error("parent node {0} is not part of the tree data")]
    UnknownParent(NodeId),

    /// Reading a dataset or configuration file failed.
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A dataset or configuration file is not valid JSON for its schema.
    #[error("failed to parse '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Create an I/O error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a JSON error for the given path.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
