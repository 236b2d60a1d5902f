//! Error types for the installer
//!
//! Structural problems (unparseable graph, absent host, failed write) abort
//! the pass before anything is written. Per-file problems are recoverable:
//! the installer logs them and carries on.

use std::path::PathBuf;

use graft_compose::ComposeError;
use graft_index::IndexError;
use graft_store::{ParseError, SerializeError};

use crate::config::ConfigError;
use crate::state::InstallState;

/// Main installer error type
#[derive(Debug, thiserror::Error)]
pub enum GraftError {
    /// Configuration unusable
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Project file unreadable or malformed
    #[error("cannot load project: {0}")]
    Parse(#[from] ParseError),

    /// The named host target does not exist
    #[error("host target '{0}' not found")]
    HostNotFound(String),

    /// Target lookup failed for another reason (ambiguous name)
    #[error("lookup failed: {0}")]
    Lookup(#[from] IndexError),

    /// A composer failed
    #[error("graph update failed: {0}")]
    Compose(#[from] ComposeError),

    /// Writing the project failed
    #[error("write failed: {0}")]
    Write(#[from] SerializeError),

    /// The updated graph would refer to absent objects
    #[error("graph integrity check failed: {problems} problems")]
    Integrity {
        /// Dangling references plus duplicate entries
        problems: usize,
    },

    /// One fixed file is missing on disk
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// The pass tried to move between states out of order
    #[error("illegal state transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: InstallState,
        /// Requested state
        to: InstallState,
    },
}

impl GraftError {
    /// Whether the error aborts the whole pass
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::FileNotFound(_))
    }

    /// Map a lookup failure for the host into the host-specific variant
    #[must_use]
    pub fn from_host_lookup(error: IndexError) -> Self {
        match error {
            IndexError::TargetNotFound(name) => Self::HostNotFound(name),
            other => Self::Lookup(other),
        }
    }
}

/// Result type alias for installer operations
pub type GraftResult<T> = Result<T, GraftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_files_are_recoverable() {
        assert!(!GraftError::FileNotFound(PathBuf::from("a.swift")).is_fatal());
        assert!(GraftError::HostNotFound("App".into()).is_fatal());
        assert!(GraftError::Integrity { problems: 1 }.is_fatal());
        assert!(GraftError::Parse(ParseError::MissingKey("objects")).is_fatal());
    }

    #[test]
    fn host_lookup_maps_not_found() {
        let err = GraftError::from_host_lookup(IndexError::TargetNotFound("App".into()));
        assert!(matches!(err, GraftError::HostNotFound(name) if name == "App"));
        let err = GraftError::from_host_lookup(IndexError::AmbiguousTarget {
            name: "App".into(),
            count: 2,
        });
        assert!(matches!(err, GraftError::Lookup(_)));
        assert!(err.to_string().contains("ambiguous"));
    }
}
