//! Capability document composer
//!
//! The document on disk is merged, never replaced: groups already listed
//! are kept in their order and new groups are appended.

use std::fs;
use std::io;
use std::path::Path;

use graft_model::{ModelError, ObjectId, PhaseKind, ProjectGraph};
use graft_store::{write_if_changed, CapabilityDocument, ParseError, SaveOutcome};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ComposeError, ComposeResult};
use crate::group::stage_files;
use crate::outcome::Ensured;
use crate::phase::{bind_files, ensure_phase};

/// Read the document at `path` and merge `groups` under `key`, without
/// writing
///
/// A missing file starts from an empty document. The flag is true when the
/// rendered result differs from the bytes on disk.
///
/// # Errors
/// Returns `ComposeError::Capability` if the existing file is unreadable
/// or malformed.
pub fn plan_capability_document<S: AsRef<str>>(
    path: &Path,
    key: &str,
    groups: &[S],
) -> ComposeResult<(CapabilityDocument, bool)> {
    let capability_error = |source| ComposeError::Capability {
        path: path.to_path_buf(),
        source,
    };
    let existing = match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(capability_error(ParseError::io_error(path, e))),
    };
    let mut document = match &existing {
        Some(content) => CapabilityDocument::parse_with_key(content, key).map_err(capability_error)?,
        None => CapabilityDocument::new(key, std::iter::empty::<String>()),
    };
    if document.merge(groups.iter().map(AsRef::as_ref)) {
        debug!(path = %path.display(), groups = document.groups().len(), "merged capability groups");
    }
    let changed = existing.as_deref() != Some(document.render().as_str());
    Ok((document, changed))
}

/// Merge `groups` under `key` into the document at `path` and write it
/// if its bytes change
///
/// # Errors
/// See [`plan_capability_document`]; also `ComposeError::Write` if writing
/// fails.
pub fn write_capability_document<S: AsRef<str>>(
    path: &Path,
    key: &str,
    groups: &[S],
) -> ComposeResult<(CapabilityDocument, SaveOutcome)> {
    let (document, _) = plan_capability_document(path, key, groups)?;
    let outcome = write_if_changed(path, &document.render())?;
    if outcome.written() {
        info!(path = %path.display(), "wrote capability document");
    }
    Ok((document, outcome))
}

/// Graph entries for a capability document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredDocument {
    /// File reference in the group
    pub file_ref: Ensured,
    /// Build file in the target's resources phase
    pub build_file: Ensured,
}

/// Reference `file_name` from `group` and bind it into `target`'s
/// resources phase
///
/// # Errors
/// Returns error if `group` or `target` has the wrong kind.
pub fn register_capability_document(
    graph: &mut ProjectGraph,
    group: &ObjectId,
    target: &ObjectId,
    file_name: &str,
) -> ComposeResult<RegisteredDocument> {
    let staged = stage_files(graph, group, &[file_name])?;
    let file = staged
        .files()
        .first()
        .map(|f| Ensured {
            id: f.id.clone(),
            created: f.created,
        })
        .ok_or_else(|| ModelError::missing("PBXFileReference", file_name))?;
    let phase = ensure_phase(graph, target, PhaseKind::Resources)?;
    let build_file = bind_files(graph, &phase.id, std::slice::from_ref(&file.id))?
        .pop()
        .ok_or_else(|| ModelError::missing("PBXBuildFile", file_name))?;
    Ok(RegisteredDocument {
        file_ref: file,
        build_file,
    })
}
