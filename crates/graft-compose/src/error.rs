//! Composer errors

use graft_index::IndexError;
use graft_model::ModelError;
use graft_store::{ParseError, SerializeError};
use std::path::PathBuf;

/// Errors raised while composing graph changes
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// Creating a target whose name is taken
    #[error("target '{0}' already exists")]
    TargetExists(String),

    /// Object missing or of the wrong kind
    #[error("graph error: {0}")]
    Model(#[from] ModelError),

    /// Target lookup failed
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Existing capability document could not be read
    #[error("capability document {path}: {source}")]
    Capability {
        /// Document path
        path: PathBuf,
        /// Parse failure
        #[source]
        source: ParseError,
    },

    /// Writing the capability document failed
    #[error(transparent)]
    Write(#[from] SerializeError),
}

/// Result type alias for composer operations
pub type ComposeResult<T> = Result<T, ComposeError>;
