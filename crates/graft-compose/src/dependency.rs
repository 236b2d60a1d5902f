//! Target dependency composer

use graft_index::LookupIndex;
use graft_model::{ContainerItemProxy, Dict, ObjectId, ProjectGraph, TargetDependency};
use tracing::debug;

use crate::error::ComposeResult;
use crate::outcome::Ensured;

/// `proxyType` for a proxy naming a target in the same project
const TARGET_REFERENCE_PROXY: &str = "1";

/// Make `host` depend on `dependency`
///
/// Adds a container proxy and a dependency object to the host's
/// dependency list unless one already points at `dependency`.
///
/// # Errors
/// Returns error if either id is not a target.
pub fn ensure_target_dependency(
    graph: &mut ProjectGraph,
    host: &ObjectId,
    dependency: &ObjectId,
) -> ComposeResult<Ensured> {
    if let Some(id) = LookupIndex::new(graph).dependency_on(host, dependency) {
        return Ok(Ensured::reused(id));
    }
    let remote_info = graph.target_mut(dependency)?.name.clone();
    let container_portal = graph.root_id().clone();

    let proxy = graph.insert(ContainerItemProxy {
        container_portal,
        proxy_type: TARGET_REFERENCE_PROXY.to_string(),
        remote_global_id: dependency.to_string(),
        remote_info: Some(remote_info),
        extra: Dict::new(),
    });
    let id = graph.insert(TargetDependency {
        target: Some(dependency.clone()),
        target_proxy: Some(proxy),
        extra: Dict::new(),
    });
    graph.target_mut(host)?.dependencies.push(id.clone());
    debug!(host = %host, dependency = %dependency, id = %id, "added target dependency");
    Ok(Ensured::created(id))
}
