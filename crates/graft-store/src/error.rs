//! Error types for the graph store
//!
//! Provides error handling for:
//! - Parse operations (text → graph)
//! - Serialize operations (graph → file)

use graft_model::ModelError;
use std::path::PathBuf;

/// Errors while loading a project file
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Malformed property-list syntax
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
        /// What went wrong
        message: String,
    },

    /// Archive or object version this store does not understand
    #[error("unsupported project format: {0}")]
    UnsupportedVersion(String),

    /// Mandatory top-level key absent
    #[error("missing top-level key: '{0}'")]
    MissingKey(&'static str),

    /// An object failed typed decoding
    #[error("invalid object {id}: {source}")]
    InvalidObject {
        /// Offending object
        id: String,
        /// Decoding failure
        #[source]
        source: ModelError,
    },

    /// Capability document is not an XML property list
    #[error("malformed capability document: {0}")]
    MalformedCapability(String),

    /// Graph-level inconsistency (duplicate id, bad root)
    #[error("invalid graph: {0}")]
    Graph(#[from] ModelError),

    /// IO error during file read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors while writing a project or capability file
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    /// Refused to write a graph with dangling references
    #[error("graph has {0} dangling reference(s); refusing to write")]
    DanglingReferences(usize),

    /// IO error during file write
    #[error("io error writing {path}: {source}")]
    Io {
        /// File being written
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },
}

impl SerializeError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_display() {
        let err = ParseError::Syntax {
            line: 3,
            column: 7,
            message: "expected '='".into(),
        };
        assert_eq!(err.to_string(), "syntax error at 3:7: expected '='");
    }

    #[test]
    fn missing_key_display() {
        let err = ParseError::MissingKey("rootObject");
        assert_eq!(err.to_string(), "missing top-level key: 'rootObject'");
    }
}
