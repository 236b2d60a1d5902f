//! Build phase composer
//!
//! Phases are found by kind (or by copy destination) on the owning target
//! and created only when absent. Build files are added only for references
//! the phase does not already wrap.

use graft_index::LookupIndex;
use graft_model::{BuildFile, BuildPhase, Dict, ObjectId, PhaseKind, ProjectGraph, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ComposeResult;
use crate::outcome::Ensured;

/// Where an embedded product is copied inside the host bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbedDestination {
    /// `PlugIns`, used by classic app extensions
    #[default]
    Plugins,
    /// `$(EXTENSIONS_FOLDER_PATH)`, used by ExtensionKit extensions
    ExtensionKit,
}

impl EmbedDestination {
    /// `dstSubfolderSpec` of the copy phase
    #[must_use]
    pub const fn subfolder_spec(self) -> &'static str {
        match self {
            Self::Plugins => "13",
            Self::ExtensionKit => "16",
        }
    }

    /// `dstPath` of the copy phase
    #[must_use]
    pub const fn dst_path(self) -> &'static str {
        match self {
            Self::Plugins => "",
            Self::ExtensionKit => "$(EXTENSIONS_FOLDER_PATH)",
        }
    }

    /// Name of the copy phase
    #[must_use]
    pub const fn phase_name(self) -> &'static str {
        match self {
            Self::Plugins => "Embed Foundation Extensions",
            Self::ExtensionKit => "Embed ExtensionKit Extensions",
        }
    }
}

/// Find `target`'s phase of `kind`, creating and attaching one if missing
///
/// # Errors
/// Returns error if `target` is not a target.
pub fn ensure_phase(graph: &mut ProjectGraph, target: &ObjectId, kind: PhaseKind) -> ComposeResult<Ensured> {
    if let Some(id) = LookupIndex::new(graph).phase_of_kind(target, kind) {
        return Ok(Ensured::reused(id));
    }
    let id = graph.insert(BuildPhase::new(kind));
    graph.target_mut(target)?.build_phases.push(id.clone());
    debug!(target = %target, phase = kind.default_name(), id = %id, "created build phase");
    Ok(Ensured::created(id))
}

/// Wrap each of `refs` in a build file in `phase`, skipping references
/// the phase already wraps
///
/// # Errors
/// Returns error if `phase` is not a build phase.
pub fn bind_files(graph: &mut ProjectGraph, phase: &ObjectId, refs: &[ObjectId]) -> ComposeResult<Vec<Ensured>> {
    let mut bound = Vec::with_capacity(refs.len());
    for file_ref in refs {
        if let Some(id) = LookupIndex::new(graph).build_file_in_phase(phase, file_ref) {
            bound.push(Ensured::reused(id));
            continue;
        }
        let id = graph.insert(BuildFile::wrapping(file_ref.clone()));
        graph.build_phase_mut(phase)?.files.push(id.clone());
        debug!(phase = %phase, file = %file_ref, id = %id, "bound file");
        bound.push(Ensured::created(id));
    }
    Ok(bound)
}

/// Embed `product` into `host` through the copy phase for `destination`
///
/// If any copy phase of the host already embeds the product, that entry is
/// returned and nothing is added.
///
/// # Errors
/// Returns error if `host` is not a target.
pub fn add_embed_entry(
    graph: &mut ProjectGraph,
    host: &ObjectId,
    product: &ObjectId,
    destination: EmbedDestination,
) -> ComposeResult<Ensured> {
    if let Some(id) = existing_embed(graph, host, product) {
        debug!(host = %host, product = %product, "embed entry already present");
        return Ok(Ensured::reused(id));
    }

    let phase = LookupIndex::new(graph).copy_phase(
        host,
        destination.subfolder_spec(),
        Some(destination.dst_path()),
    );
    let phase = match phase {
        Some(id) => id,
        None => {
            let mut copy = BuildPhase::new(PhaseKind::CopyFiles);
            copy.name = Some(destination.phase_name().to_string());
            copy.dst_subfolder_spec = Some(destination.subfolder_spec().to_string());
            copy.dst_path = Some(destination.dst_path().to_string());
            let id = graph.insert(copy);
            graph.target_mut(host)?.build_phases.push(id.clone());
            debug!(host = %host, phase = destination.phase_name(), id = %id, "created embed phase");
            id
        }
    };

    let mut settings = Dict::new();
    settings.insert(
        "ATTRIBUTES".into(),
        Value::Array(vec![Value::from("RemoveHeadersOnCopy")]),
    );
    let id = graph.insert(BuildFile::wrapping(product.clone()).with_settings(settings));
    graph.build_phase_mut(&phase)?.files.push(id.clone());
    debug!(host = %host, product = %product, id = %id, "added embed entry");
    Ok(Ensured::created(id))
}

fn existing_embed(graph: &ProjectGraph, host: &ObjectId, product: &ObjectId) -> Option<ObjectId> {
    let index = LookupIndex::new(graph);
    graph
        .target(host)?
        .build_phases
        .iter()
        .filter(|id| {
            graph
                .build_phase(id)
                .is_some_and(|p| p.kind == PhaseKind::CopyFiles)
        })
        .find_map(|phase| index.build_file_in_phase(phase, product))
}
