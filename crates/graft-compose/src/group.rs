//! Group and file composer
//!
//! Reuses groups and file references when they already exist, creates them
//! otherwise. Never touches the filesystem.

use std::path::Path;

use graft_index::LookupIndex;
use graft_model::{FileReference, Group, ObjectId, ProjectGraph};
use serde::Serialize;
use tracing::debug;

use crate::error::ComposeResult;
use crate::outcome::Ensured;

/// Which phase a staged file belongs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileClass {
    /// Compiled in the sources phase
    Source,
    /// Copied in the resources phase
    Resource,
}

impl FileClass {
    /// Classify by extension; anything unrecognised is a resource
    #[must_use]
    pub fn of(path: &str) -> Self {
        match extension(path) {
            Some("swift" | "m" | "mm" | "c" | "cc" | "cpp" | "cxx" | "metal" | "intentdefinition") => {
                Self::Source
            }
            _ => Self::Resource,
        }
    }
}

fn extension(path: &str) -> Option<&str> {
    Path::new(path).extension().and_then(|e| e.to_str())
}

/// `lastKnownFileType` for a path
#[must_use]
pub fn last_known_file_type(path: &str) -> &'static str {
    match extension(path) {
        Some("swift") => "sourcecode.swift",
        Some("m") => "sourcecode.c.objc",
        Some("mm") => "sourcecode.cpp.objcpp",
        Some("c") => "sourcecode.c.c",
        Some("cc" | "cpp" | "cxx") => "sourcecode.cpp.cpp",
        Some("h") => "sourcecode.c.h",
        Some("metal") => "sourcecode.metal",
        Some("intentdefinition") => "file.intentdefinition",
        Some("plist") => "text.plist.xml",
        Some("entitlements") => "text.plist.entitlements",
        Some("strings") => "text.plist.strings",
        Some("xcassets") => "folder.assetcatalog",
        Some("storyboard") => "file.storyboard",
        Some("xib") => "file.xib",
        Some("json") => "text.json",
        Some("png") => "image.png",
        _ => "text",
    }
}

/// One file after staging
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedFile {
    /// Path relative to the group
    pub path: String,
    /// File reference
    pub id: ObjectId,
    /// Phase class
    pub class: FileClass,
    /// True when the reference was created by this call
    pub created: bool,
}

/// Files staged into one group, in request order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StagedFiles(Vec<StagedFile>);

impl StagedFiles {
    /// All staged files
    #[must_use]
    pub fn files(&self) -> &[StagedFile] {
        &self.0
    }

    /// References of class `class`, in request order
    #[must_use]
    pub fn ids_of(&self, class: FileClass) -> Vec<ObjectId> {
        self.0
            .iter()
            .filter(|f| f.class == class)
            .map(|f| f.id.clone())
            .collect()
    }

    /// Reference staged for `path`
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&ObjectId> {
        self.0.iter().find(|f| f.path == path).map(|f| &f.id)
    }

    /// Number of references created
    #[must_use]
    pub fn created(&self) -> usize {
        self.0.iter().filter(|f| f.created).count()
    }
}

/// Find the group called `name` or create it under the main group
///
/// # Errors
/// Returns error if the main group is missing or not a group.
pub fn ensure_group(graph: &mut ProjectGraph, name: &str) -> ComposeResult<Ensured> {
    if let Some(id) = LookupIndex::new(graph).group_by_name(name) {
        debug!(group = name, id = %id, "reusing group");
        return Ok(Ensured::reused(id));
    }
    let id = graph.insert(Group::folder(name));
    let main = graph.project().main_group.clone();
    graph.group_mut(&main)?.children.push(id.clone());
    debug!(group = name, id = %id, "created group");
    Ok(Ensured::created(id))
}

/// Stage `paths` as children of `group`
///
/// A child reference with the same path is reused; otherwise a new
/// reference is created and appended.
///
/// # Errors
/// Returns error if `group` is not a group.
pub fn stage_files<S: AsRef<str>>(
    graph: &mut ProjectGraph,
    group: &ObjectId,
    paths: &[S],
) -> ComposeResult<StagedFiles> {
    let mut staged = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let class = FileClass::of(path);
        let existing = LookupIndex::new(graph).file_in_group(group, path);
        let (id, created) = match existing {
            Some(id) => {
                debug!(path, id = %id, "reusing file reference");
                (id, false)
            }
            None => {
                let id = graph.insert(FileReference::source(path, last_known_file_type(path)));
                graph.group_mut(group)?.children.push(id.clone());
                debug!(path, id = %id, ?class, "created file reference");
                (id, true)
            }
        };
        staged.push(StagedFile {
            path: path.to_string(),
            id,
            class,
            created,
        });
    }
    Ok(StagedFiles(staged))
}
