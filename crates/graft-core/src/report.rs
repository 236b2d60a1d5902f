//! What one installation pass did

use std::path::PathBuf;

use graft_compose::{Ensured, StagedFile};
use graft_model::ObjectId;
use serde::Serialize;

use crate::config::ReconcileMode;
use crate::state::InstallState;

/// Capability document outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityReport {
    /// Path relative to the source root
    pub path: String,
    /// Property-list key
    pub key: String,
    /// Groups after merging
    pub groups: Vec<String>,
    /// Rendered bytes differ from the file on disk
    pub changed: bool,
    /// File was written
    pub written: bool,
}

/// Summary of one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// Extension target name
    pub extension: String,
    /// Host target
    pub host: ObjectId,
    /// Mode the pass ran in
    pub mode: ReconcileMode,
    /// Nothing was written
    pub dry_run: bool,
    /// States visited
    pub states: Vec<InstallState>,
    /// Extension target
    pub target: Ensured,
    /// Extension group
    pub group: Option<Ensured>,
    /// File references staged, capability document included
    pub files: Vec<StagedFile>,
    /// Fixed files missing on disk
    pub skipped_files: Vec<PathBuf>,
    /// Build files in the extension's phases
    pub build_files: Vec<Ensured>,
    /// Capability document
    pub capability: Option<CapabilityReport>,
    /// Extension configurations whose settings changed
    pub configurations_changed: usize,
    /// Embed entry in the host's copy phase
    pub embed: Option<Ensured>,
    /// Host dependency on the extension
    pub dependency: Option<Ensured>,
    /// The graph differs from what was loaded
    pub graph_changed: bool,
    /// The project file was rewritten
    pub graph_written: bool,
}

impl InstallReport {
    pub(crate) fn new(
        extension: impl Into<String>,
        host: ObjectId,
        target: Ensured,
        mode: ReconcileMode,
        dry_run: bool,
    ) -> Self {
        Self {
            extension: extension.into(),
            host,
            mode,
            dry_run,
            states: Vec::new(),
            target,
            group: None,
            files: Vec::new(),
            skipped_files: Vec::new(),
            build_files: Vec::new(),
            capability: None,
            configurations_changed: 0,
            embed: None,
            dependency: None,
            graph_changed: false,
            graph_written: false,
        }
    }

    /// Number of graph objects this pass created
    ///
    /// Counts the objects listed in the report; the product reference,
    /// configurations, phases and proxies created alongside them are not
    /// counted separately.
    #[must_use]
    pub fn created(&self) -> usize {
        let files = self.files.iter().filter(|f| f.created).count();
        let ensured = std::iter::once(&self.target)
            .chain(&self.group)
            .chain(&self.build_files)
            .chain(&self.embed)
            .chain(&self.dependency)
            .filter(|e| e.created)
            .count();
        files + ensured
    }

    /// True when the pass found everything already in place
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.graph_changed && self.capability.as_ref().map_or(true, |c| !c.changed)
    }
}
