//! Post-pass graph checks

use std::collections::HashSet;

use graft_model::{ObjectId, ProjectGraph};
use serde::Serialize;

/// A group listing two references to the same path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateChild {
    /// Group
    pub group: ObjectId,
    /// Path listed twice
    pub path: String,
}

/// A phase wrapping the same file reference twice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateBuildFile {
    /// Phase
    pub phase: ObjectId,
    /// Reference wrapped twice
    pub file_ref: ObjectId,
}

/// Problems found in a graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// `(from, to)` pairs where `to` is absent
    pub dangling: Vec<(ObjectId, ObjectId)>,
    /// Duplicate file references within one group
    pub duplicate_children: Vec<DuplicateChild>,
    /// Duplicate build files within one phase
    pub duplicate_build_files: Vec<DuplicateBuildFile>,
}

impl VerifyReport {
    /// True when nothing was found
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.problems() == 0
    }

    /// Total number of problems
    #[must_use]
    pub fn problems(&self) -> usize {
        self.dangling.len() + self.duplicate_children.len() + self.duplicate_build_files.len()
    }
}

/// Check referential integrity and per-group / per-phase uniqueness
#[must_use]
pub fn verify(graph: &ProjectGraph) -> VerifyReport {
    let mut report = VerifyReport {
        dangling: graph
            .dangling_references()
            .into_iter()
            .map(|d| (d.from, d.to))
            .collect(),
        ..VerifyReport::default()
    };

    for (id, object) in graph.iter() {
        if let Some(group) = object.as_group() {
            let mut seen = HashSet::new();
            for child in &group.children {
                let Some(path) = graph.file_reference(child).and_then(|f| f.path.as_deref()) else {
                    continue;
                };
                if !seen.insert(path) {
                    report.duplicate_children.push(DuplicateChild {
                        group: id.clone(),
                        path: path.to_string(),
                    });
                }
            }
        }
        if let Some(phase) = object.as_build_phase() {
            let mut seen = HashSet::new();
            for build_file in &phase.files {
                let Some(file_ref) = graph.build_file(build_file).and_then(|b| b.file_ref.as_ref()) else {
                    continue;
                };
                if !seen.insert(file_ref) {
                    report.duplicate_build_files.push(DuplicateBuildFile {
                        phase: id.clone(),
                        file_ref: file_ref.clone(),
                    });
                }
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_model::BuildFile;
    use graft_test_utils::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fixture_is_clean() {
        let doc = host_app_document();
        assert_eq!(verify(doc.graph()), VerifyReport::default());
    }

    #[test]
    fn finds_duplicates_and_dangling() {
        let mut doc = host_app_document();
        let graph = doc.graph_mut();
        let app_delegate = oid("13B07FB01A68108700A75B9A");
        graph
            .group_mut(&oid(APP_GROUP_ID))
            .unwrap()
            .children
            .push(app_delegate.clone());
        let extra = graph.insert(BuildFile::wrapping(app_delegate.clone()));
        let sources = oid("13B07F871A680F5B00A75B9A");
        graph.build_phase_mut(&sources).unwrap().files.push(extra);
        graph
            .group_mut(&oid(MAIN_GROUP_ID))
            .unwrap()
            .children
            .push(oid("DEADBEEFDEADBEEFDEADBEEF"));

        let report = verify(graph);
        assert_eq!(report.problems(), 3);
        assert_eq!(report.duplicate_children[0].path, "AppDelegate.swift");
        assert_eq!(report.duplicate_build_files[0].file_ref, app_delegate);
        assert_eq!(report.dangling[0].1, oid("DEADBEEFDEADBEEFDEADBEEF"));
    }
}
