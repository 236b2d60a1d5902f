//! Lookup index over a project graph
//!
//! Provides [`LookupIndex`], a read-only view that answers the questions the
//! composers ask before mutating: does this target exist, which group is
//! called X, which phase owns this build file.
//!
//! The index borrows the graph, so it is built, queried, and dropped before
//! each mutation. Lookups return owned identifiers for that reason.

use std::collections::{HashMap, HashSet, VecDeque};

use graft_model::{BuildConfiguration, BuildPhase, Object, ObjectId, PhaseKind, ProjectGraph};

/// Lookup errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// No target with this name or identifier
    #[error("no target named or identified by '{0}'")]
    TargetNotFound(String),

    /// More than one target carries the name
    #[error("target name '{name}' is ambiguous ({count} targets)")]
    AmbiguousTarget {
        /// Name searched for
        name: String,
        /// Number of targets carrying it
        count: usize,
    },
}

/// Read-only lookup index
#[derive(Debug)]
pub struct LookupIndex<'g> {
    graph: &'g ProjectGraph,
    targets_by_name: HashMap<&'g str, Vec<&'g ObjectId>>,
    parent_of: HashMap<&'g ObjectId, &'g ObjectId>,
    phase_of: HashMap<&'g ObjectId, &'g ObjectId>,
}

impl<'g> LookupIndex<'g> {
    /// Index `graph`
    #[must_use]
    pub fn new(graph: &'g ProjectGraph) -> Self {
        let mut targets_by_name: HashMap<&str, Vec<&ObjectId>> = HashMap::new();
        let mut parent_of = HashMap::new();
        let mut phase_of = HashMap::new();

        for (id, object) in graph.iter() {
            match object {
                Object::Target(target) => {
                    targets_by_name.entry(target.name.as_str()).or_default().push(id);
                }
                Object::Group(group) => {
                    for child in &group.children {
                        parent_of.entry(child).or_insert(id);
                    }
                }
                Object::BuildPhase(phase) => {
                    for file in &phase.files {
                        phase_of.entry(file).or_insert(id);
                    }
                }
                _ => {}
            }
        }

        Self {
            graph,
            targets_by_name,
            parent_of,
            phase_of,
        }
    }

    /// Indexed graph
    #[inline]
    #[must_use]
    pub fn graph(&self) -> &'g ProjectGraph {
        self.graph
    }

    /// First target (in table order) named `name`
    #[must_use]
    pub fn target_by_name(&self, name: &str) -> Option<ObjectId> {
        self.targets_by_name
            .get(name)
            .and_then(|ids| ids.first())
            .map(|id| (*id).clone())
    }

    /// The single target named `name`
    ///
    /// # Errors
    /// Returns `IndexError::AmbiguousTarget` when several targets share it.
    pub fn unique_target_by_name(&self, name: &str) -> Result<Option<ObjectId>, IndexError> {
        match self.targets_by_name.get(name).map(Vec::as_slice) {
            None | Some([]) => Ok(None),
            Some([id]) => Ok(Some((*id).clone())),
            Some(ids) => Err(IndexError::AmbiguousTarget {
                name: name.to_string(),
                count: ids.len(),
            }),
        }
    }

    /// Resolve a target given either its identifier or its (unique) name
    ///
    /// # Errors
    /// Returns `IndexError::TargetNotFound` or `IndexError::AmbiguousTarget`.
    pub fn resolve_target(&self, name_or_id: &str) -> Result<ObjectId, IndexError> {
        if let Ok(id) = ObjectId::new(name_or_id) {
            if self.graph.target(&id).is_some() {
                return Ok(id);
            }
        }
        self.unique_target_by_name(name_or_id)?
            .ok_or_else(|| IndexError::TargetNotFound(name_or_id.to_string()))
    }

    /// Group whose `name` (else `path`) equals `name`
    ///
    /// Searches breadth-first from the main group so the shallowest match
    /// wins, then falls back to groups not reachable from it.
    #[must_use]
    pub fn group_by_name(&self, name: &str) -> Option<ObjectId> {
        let main = &self.graph.project().main_group;
        let mut queue = VecDeque::from([main]);
        let mut seen = HashSet::new();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            let Some(group) = self.graph.group(id) else {
                continue;
            };
            if group.display_name() == Some(name) {
                return Some(id.clone());
            }
            queue.extend(group.children.iter());
        }

        self.graph
            .iter()
            .filter(|(id, _)| !seen.contains(id))
            .find(|(_, object)| {
                object
                    .as_group()
                    .is_some_and(|g| g.display_name() == Some(name))
            })
            .map(|(id, _)| id.clone())
    }

    /// Lazily iterate build configurations accepted by `predicate`
    pub fn configurations_matching<P>(
        &self,
        predicate: P,
    ) -> impl Iterator<Item = (&'g ObjectId, &'g BuildConfiguration)> + 'g
    where
        P: Fn(&BuildConfiguration) -> bool + 'g,
    {
        self.graph.iter().filter_map(move |(id, object)| {
            object
                .as_configuration()
                .filter(|config| predicate(config))
                .map(|config| (id, config))
        })
    }

    /// Configurations reachable through `target`'s own configuration list
    #[must_use]
    pub fn configurations_of_target(&self, target: &ObjectId) -> Vec<ObjectId> {
        self.graph
            .target(target)
            .and_then(|t| self.graph.configuration_list(&t.build_configuration_list))
            .map(|list| {
                list.build_configurations
                    .iter()
                    .filter(|id| self.graph.configuration(id).is_some())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Configuration names of the project-level list, in list order
    #[must_use]
    pub fn project_configuration_names(&self) -> Vec<String> {
        self.graph
            .configuration_list(&self.graph.project().build_configuration_list)
            .map(|list| {
                list.build_configurations
                    .iter()
                    .filter_map(|id| self.graph.configuration(id))
                    .map(|c| c.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Phase listing `build_file`
    #[must_use]
    pub fn phase_of_build_file(&self, build_file: &ObjectId) -> Option<ObjectId> {
        self.phase_of.get(build_file).map(|id| (*id).clone())
    }

    /// Group listing `child`
    #[must_use]
    pub fn parent_group(&self, child: &ObjectId) -> Option<ObjectId> {
        self.parent_of.get(child).map(|id| (*id).clone())
    }

    /// File reference child of `group` whose `path` equals `path`
    #[must_use]
    pub fn file_in_group(&self, group: &ObjectId, path: &str) -> Option<ObjectId> {
        self.graph
            .group(group)?
            .children
            .iter()
            .find(|child| {
                self.graph
                    .file_reference(child)
                    .is_some_and(|file| file.path.as_deref() == Some(path))
            })
            .cloned()
    }

    /// First phase of `kind` among `target`'s phases
    #[must_use]
    pub fn phase_of_kind(&self, target: &ObjectId, kind: PhaseKind) -> Option<ObjectId> {
        self.target_phases(target)
            .find(|(_, phase)| phase.kind == kind)
            .map(|(id, _)| id.clone())
    }

    /// Copy-files phase of `target` with the given destination
    #[must_use]
    pub fn copy_phase(
        &self,
        target: &ObjectId,
        dst_subfolder_spec: &str,
        dst_path: Option<&str>,
    ) -> Option<ObjectId> {
        self.target_phases(target)
            .find(|(_, phase)| {
                phase.kind == PhaseKind::CopyFiles
                    && phase.dst_subfolder_spec.as_deref() == Some(dst_subfolder_spec)
                    && phase.dst_path.as_deref().unwrap_or("") == dst_path.unwrap_or("")
            })
            .map(|(id, _)| id.clone())
    }

    /// Build file in `phase` wrapping `file_ref`
    #[must_use]
    pub fn build_file_in_phase(&self, phase: &ObjectId, file_ref: &ObjectId) -> Option<ObjectId> {
        self.graph
            .build_phase(phase)?
            .files
            .iter()
            .find(|bf| {
                self.graph
                    .build_file(bf)
                    .is_some_and(|b| b.file_ref.as_ref() == Some(file_ref))
            })
            .cloned()
    }

    /// Dependency object of `target` pointing at `dependency`
    #[must_use]
    pub fn dependency_on(&self, target: &ObjectId, dependency: &ObjectId) -> Option<ObjectId> {
        self.graph
            .target(target)?
            .dependencies
            .iter()
            .find(|id| {
                self.graph
                    .get(id)
                    .and_then(Object::as_target_dependency)
                    .is_some_and(|d| d.target.as_ref() == Some(dependency))
            })
            .cloned()
    }

    fn target_phases(
        &self,
        target: &ObjectId,
    ) -> impl Iterator<Item = (&'g ObjectId, &'g BuildPhase)> + '_ {
        let graph = self.graph;
        graph
            .target(target)
            .map(|t| t.build_phases.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |id| graph.build_phase(id).map(|phase| (id, phase)))
    }
}
