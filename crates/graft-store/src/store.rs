//! On-disk project store
//!
//! The only component of the workspace that touches project files. Reads
//! go through [`ProjectStore::open`]; writes go through a temporary file in
//! the destination directory followed by an atomic rename, so a failed
//! write leaves the original file intact.
//!
//! Writes that must land together are staged first ([`PendingWrite`]) and
//! committed back to back once every file has been prepared; a committed
//! write can be rolled back if a later one fails.

use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::document::ProjectDocument;
use crate::error::{ParseError, SerializeError};
use crate::parsers::{DocumentParser, PbxprojParser};

/// File inside an `.xcodeproj` bundle holding the graph
pub const PROJECT_FILE: &str = "project.pbxproj";

/// Result of a save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Serialized bytes equal the file on disk; nothing written
    Unchanged,
    /// File replaced atomically
    Written,
}

impl SaveOutcome {
    /// True when bytes reached the disk
    #[inline]
    #[must_use]
    pub fn written(self) -> bool {
        matches!(self, Self::Written)
    }
}

/// A project file on disk and the bytes it held when last read or written
#[derive(Debug, Clone)]
pub struct ProjectStore {
    path: PathBuf,
    original: String,
}

impl ProjectStore {
    /// Open a project
    ///
    /// `path` may name the `project.pbxproj` file, an `.xcodeproj` bundle,
    /// or a directory holding exactly one `.xcodeproj` bundle.
    ///
    /// # Errors
    /// Returns `ParseError::Io` if no project file can be located or read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = resolve_project_file(path.as_ref())?;
        let original = fs::read_to_string(&path).map_err(|e| ParseError::io_error(&path, e))?;
        debug!(path = %path.display(), bytes = original.len(), "read project file");
        Ok(Self { path, original })
    }

    /// Parse the bytes read at open (or last saved)
    ///
    /// # Errors
    /// See [`ProjectDocument::parse`].
    pub fn load(&self) -> Result<ProjectDocument, ParseError> {
        PbxprojParser.parse(&self.original)
    }

    /// Path of the `project.pbxproj` file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the `.xcodeproj` bundle; group paths are
    /// relative to it
    #[must_use]
    pub fn project_root(&self) -> &Path {
        self.path
            .parent()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new("."))
    }

    /// Text the store currently believes is on disk
    #[inline]
    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Write `doc` back if its serialization differs from the file
    ///
    /// # Errors
    /// Returns `SerializeError::DanglingReferences` if the graph refers to
    /// absent objects, or `SerializeError::Io` if the write fails.
    pub fn save(&mut self, doc: &ProjectDocument) -> Result<SaveOutcome, SerializeError> {
        match self.stage(doc)? {
            Some(pending) => {
                self.commit(pending)?;
                Ok(SaveOutcome::Written)
            }
            None => Ok(SaveOutcome::Unchanged),
        }
    }

    /// Serialize `doc` into a temporary file next to the project file
    ///
    /// Returns `None` when the text equals the file on disk. Nothing is
    /// visible at [`ProjectStore::path`] until [`ProjectStore::commit`].
    ///
    /// # Errors
    /// Returns `SerializeError::DanglingReferences` if the graph refers to
    /// absent objects, or `SerializeError::Io` if the temporary file cannot
    /// be created.
    pub fn stage(&self, doc: &ProjectDocument) -> Result<Option<PendingWrite>, SerializeError> {
        let dangling = doc.graph().dangling_references();
        if !dangling.is_empty() {
            return Err(SerializeError::DanglingReferences(dangling.len()));
        }
        let text = doc.to_text();
        if text == self.original {
            debug!(path = %self.path.display(), "project unchanged; skipping write");
            return Ok(None);
        }
        let previous = Some(self.original.clone().into_bytes());
        PendingWrite::with_previous(self.path.clone(), text, previous).map(Some)
    }

    /// Move a write staged by [`ProjectStore::stage`] into place
    ///
    /// # Errors
    /// Returns `SerializeError::Io` if the rename fails; the project file
    /// is then unchanged.
    pub fn commit(&mut self, pending: PendingWrite) -> Result<CommittedWrite, SerializeError> {
        let text = pending.contents.clone();
        let committed = pending.commit()?;
        info!(path = %self.path.display(), bytes = text.len(), "wrote project file");
        self.original = text;
        Ok(committed)
    }
}

/// A write prepared in a sibling temporary file
#[derive(Debug)]
pub struct PendingWrite {
    path: PathBuf,
    tmp: NamedTempFile,
    contents: String,
    previous: Option<Vec<u8>>,
}

impl PendingWrite {
    /// Stage `contents` for `path`, remembering what the file holds now
    ///
    /// # Errors
    /// Returns `SerializeError::Io` if the current file cannot be read or
    /// the temporary file cannot be written.
    pub fn prepare(path: impl Into<PathBuf>, contents: impl Into<String>) -> Result<Self, SerializeError> {
        let path = path.into();
        let previous = read_existing(&path)?;
        Self::with_previous(path, contents.into(), previous)
    }

    fn with_previous(path: PathBuf, contents: String, previous: Option<Vec<u8>>) -> Result<Self, SerializeError> {
        let tmp = temp_sibling(&path, contents.as_bytes())?;
        Ok(Self {
            path,
            tmp,
            contents,
            previous,
        })
    }

    /// Destination path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rename the temporary file over the destination
    ///
    /// # Errors
    /// Returns `SerializeError::Io` if the rename fails; the destination is
    /// then unchanged and the temporary file is removed.
    pub fn commit(self) -> Result<CommittedWrite, SerializeError> {
        let Self { path, tmp, previous, .. } = self;
        tmp.persist(&path)
            .map_err(|e| SerializeError::io_error(&path, e.error))?;
        debug!(path = %path.display(), "committed staged write");
        Ok(CommittedWrite { path, previous })
    }
}

/// A write that reached the disk and can still be undone
#[derive(Debug)]
pub struct CommittedWrite {
    path: PathBuf,
    previous: Option<Vec<u8>>,
}

impl CommittedWrite {
    /// Destination path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Put back the bytes the file held before, or remove a file the write
    /// created
    ///
    /// # Errors
    /// Returns `SerializeError::Io` on any filesystem failure.
    pub fn roll_back(self) -> Result<(), SerializeError> {
        match &self.previous {
            Some(bytes) => write_atomic(&self.path, bytes)?,
            None => fs::remove_file(&self.path).map_err(|e| SerializeError::io_error(&self.path, e))?,
        }
        warn!(path = %self.path.display(), "rolled back write");
        Ok(())
    }
}

fn read_existing(path: &Path) -> Result<Option<Vec<u8>>, SerializeError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SerializeError::io_error(path, e)),
    }
}

fn temp_sibling(path: &Path, contents: &[u8]) -> Result<NamedTempFile, SerializeError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let io_err = |e| SerializeError::io_error(path, e);

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(contents).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions()).map_err(io_err)?;
    }
    Ok(tmp)
}

fn resolve_project_file(path: &Path) -> Result<PathBuf, ParseError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if path.extension().is_some_and(|ext| ext == "xcodeproj") {
        return Ok(path.join(PROJECT_FILE));
    }
    let entries = fs::read_dir(path).map_err(|e| ParseError::io_error(path, e))?;
    let mut bundles = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "xcodeproj"));
    match (bundles.next(), bundles.next()) {
        (Some(bundle), None) => Ok(bundle.join(PROJECT_FILE)),
        (None, _) => Err(ParseError::io_error(
            path,
            io::Error::new(io::ErrorKind::NotFound, "no .xcodeproj bundle"),
        )),
        (Some(_), Some(_)) => Err(ParseError::io_error(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "more than one .xcodeproj bundle"),
        )),
    }
}

/// Replace `path` with `contents` via a sibling temporary file
///
/// # Errors
/// Returns `SerializeError::Io` on any filesystem failure; the previous
/// file is left in place.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), SerializeError> {
    temp_sibling(path, contents)?
        .persist(path)
        .map_err(|e| SerializeError::io_error(path, e.error))?;
    Ok(())
}

/// Write `contents` unless the file already holds exactly these bytes
///
/// Missing parent directories are created.
///
/// # Errors
/// Returns `SerializeError::Io` on any filesystem failure.
pub fn write_if_changed(path: &Path, contents: &str) -> Result<SaveOutcome, SerializeError> {
    match stage_if_changed(path, contents)? {
        Some(pending) => {
            pending.commit()?;
            Ok(SaveOutcome::Written)
        }
        None => Ok(SaveOutcome::Unchanged),
    }
}

/// Stage `contents` for `path` unless the file already holds these bytes
///
/// Missing parent directories are created.
///
/// # Errors
/// Returns `SerializeError::Io` on any filesystem failure.
pub fn stage_if_changed(path: &Path, contents: &str) -> Result<Option<PendingWrite>, SerializeError> {
    let previous = read_existing(path)?;
    if previous.as_deref() == Some(contents.as_bytes()) {
        return Ok(None);
    }
    if previous.is_none() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SerializeError::io_error(parent, e))?;
        }
    }
    PendingWrite::with_previous(path.to_path_buf(), contents.to_string(), previous).map(Some)
}
