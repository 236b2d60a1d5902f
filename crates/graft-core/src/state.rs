//! Installer state machine
//!
//! The pass moves through a fixed sequence. Every move is checked against
//! [`allowed_transitions`] and recorded so the report shows the path taken.

use serde::Serialize;
use tracing::info;

use crate::error::{GraftError, GraftResult};

/// A step of the installation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallState {
    /// Nothing done yet
    Start,
    /// Target exists; only settings and the capability document refresh
    PatchSettingsOnly,
    /// Target, product and configurations being created
    CreateTarget,
    /// Group and file references
    StageFiles,
    /// Sources phase
    BindSourcePhase,
    /// Resources phase
    BindResourcePhase,
    /// Capability document on disk
    WriteCapabilityDocument,
    /// Capability document in the graph
    BindCapabilityResource,
    /// Build settings
    PatchSettings,
    /// Copy phase and dependency on the host
    EmbedIntoHost,
    /// Finished
    Done,
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: InstallState) -> Vec<InstallState> {
    use InstallState::*;
    match from {
        Start => vec![CreateTarget, StageFiles, PatchSettingsOnly],
        PatchSettingsOnly => vec![PatchSettings],
        CreateTarget => vec![StageFiles],
        StageFiles => vec![BindSourcePhase],
        BindSourcePhase => vec![BindResourcePhase],
        BindResourcePhase => vec![WriteCapabilityDocument],
        WriteCapabilityDocument => vec![BindCapabilityResource],
        BindCapabilityResource => vec![PatchSettings],
        PatchSettings => vec![EmbedIntoHost, Done],
        EmbedIntoHost => vec![Done],
        Done => vec![],
    }
}

/// Check one transition
///
/// # Errors
/// Returns `GraftError::IllegalTransition` when `to` is not reachable.
pub fn validate_transition(from: InstallState, to: InstallState) -> GraftResult<()> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(GraftError::IllegalTransition { from, to })
    }
}

/// Current state plus the states visited so far
#[derive(Debug, Clone)]
pub struct StateTrace {
    current: InstallState,
    visited: Vec<InstallState>,
}

impl StateTrace {
    /// Trace positioned at [`InstallState::Start`]
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: InstallState::Start,
            visited: vec![InstallState::Start],
        }
    }

    /// Move to `to`
    ///
    /// # Errors
    /// Returns `GraftError::IllegalTransition` without moving.
    pub fn advance(&mut self, to: InstallState) -> GraftResult<()> {
        validate_transition(self.current, to)?;
        info!(from = ?self.current, to = ?to, "install step");
        self.current = to;
        self.visited.push(to);
        Ok(())
    }

    /// Current state
    #[must_use]
    pub fn current(&self) -> InstallState {
        self.current
    }

    /// Visited states, in order
    #[must_use]
    pub fn into_visited(self) -> Vec<InstallState> {
        self.visited
    }
}

impl Default for StateTrace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InstallState::*;

    #[test]
    fn creation_path_is_allowed() {
        let mut trace = StateTrace::new();
        for state in [
            CreateTarget,
            StageFiles,
            BindSourcePhase,
            BindResourcePhase,
            WriteCapabilityDocument,
            BindCapabilityResource,
            PatchSettings,
            EmbedIntoHost,
            Done,
        ] {
            trace.advance(state).unwrap();
        }
        assert_eq!(trace.current(), Done);
        assert_eq!(trace.into_visited().len(), 10);
    }

    #[test]
    fn settings_only_path_is_allowed() {
        let mut trace = StateTrace::new();
        trace.advance(PatchSettingsOnly).unwrap();
        trace.advance(PatchSettings).unwrap();
        trace.advance(Done).unwrap();
        assert_eq!(trace.into_visited(), [Start, PatchSettingsOnly, PatchSettings, Done]);
    }

    #[test]
    fn skipping_steps_is_rejected() {
        let mut trace = StateTrace::new();
        let err = trace.advance(EmbedIntoHost).unwrap_err();
        assert!(matches!(err, GraftError::IllegalTransition { from: Start, to: EmbedIntoHost }));
        assert_eq!(trace.current(), Start);
        assert!(validate_transition(PatchSettingsOnly, EmbedIntoHost).is_err());
        assert!(allowed_transitions(Done).is_empty());
    }
}
