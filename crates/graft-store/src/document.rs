//! Parsed project file with its layout
//!
//! A [`ProjectDocument`] pairs the typed [`ProjectGraph`] with everything
//! needed to write the file back without disturbing untouched bytes: the
//! text around the `objects` dictionary, the trivia between entries, and
//! each entry's original text.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use graft_model::{Dict, ModelError, Object, ObjectId, ProjectGraph, Value};
use indexmap::IndexMap;
use tracing::debug;

use crate::error::ParseError;
use crate::parsers::{OpenStepParser, Segment};
use crate::render;

/// `objectVersion` values this store reads and writes
pub const SUPPORTED_OBJECT_VERSIONS: RangeInclusive<u32> = 42..=77;

/// The only `archiveVersion` ever written by Xcode
pub const ARCHIVE_VERSION: &str = "1";

/// One element of the `objects` body in file order
#[derive(Debug, Clone)]
pub(crate) enum Item {
    Trivia(String),
    Entry(ObjectId),
}

/// An object as it was read
#[derive(Debug, Clone)]
pub(crate) struct Original {
    pub(crate) object: Object,
    pub(crate) text: String,
}

#[derive(Debug, Clone)]
pub(crate) struct Layout {
    pub(crate) prefix: String,
    pub(crate) items: Vec<Item>,
    pub(crate) suffix: String,
    pub(crate) originals: HashMap<ObjectId, Original>,
    pub(crate) annotations: HashMap<String, String>,
}

/// A loaded project file
#[derive(Debug, Clone)]
pub struct ProjectDocument {
    graph: ProjectGraph,
    layout: Layout,
}

impl ProjectDocument {
    /// Parse project-file text
    ///
    /// # Errors
    /// Returns error on malformed syntax, unsupported versions, missing
    /// top-level keys, or objects that fail typed decoding.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let parsed = OpenStepParser::new(source).parse_file()?;
        check_versions(&parsed.top_level)?;

        let root = parsed
            .top_level
            .get("rootObject")
            .and_then(Value::as_str)
            .ok_or(ParseError::MissingKey("rootObject"))?;
        let root = ObjectId::new(root)?;

        let mut objects = IndexMap::with_capacity(parsed.body.len());
        let mut originals = HashMap::with_capacity(parsed.body.len());
        let mut items = Vec::with_capacity(parsed.body.len());
        for segment in parsed.body {
            match segment {
                Segment::Trivia(text) => items.push(Item::Trivia(text)),
                Segment::Entry { key, value, text } => {
                    let (id, object) = decode_entry(key, value)?;
                    if objects.contains_key(&id) {
                        return Err(ModelError::DuplicateId(id).into());
                    }
                    originals.insert(
                        id.clone(),
                        Original {
                            object: object.clone(),
                            text,
                        },
                    );
                    objects.insert(id.clone(), object);
                    items.push(Item::Entry(id));
                }
            }
        }

        let graph = ProjectGraph::new(root, objects)?;
        debug!(objects = graph.len(), "parsed project graph");

        Ok(Self {
            graph,
            layout: Layout {
                prefix: parsed.prefix,
                items,
                suffix: parsed.suffix,
                originals,
                annotations: parsed.annotations,
            },
        })
    }

    /// The object graph
    #[inline]
    #[must_use]
    pub fn graph(&self) -> &ProjectGraph {
        &self.graph
    }

    /// Mutable object graph
    #[inline]
    pub fn graph_mut(&mut self) -> &mut ProjectGraph {
        &mut self.graph
    }

    /// Serialize back to project-file text
    #[must_use]
    pub fn to_text(&self) -> String {
        render::serialize(self)
    }

    /// True when any object was added or differs from its parsed form
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.graph.len() != self.layout.originals.len()
            || self.graph.iter().any(|(id, object)| {
                self.layout
                    .originals
                    .get(id)
                    .map_or(true, |original| original.object != *object)
            })
    }

    /// Identifiers of objects that did not exist when the file was read
    pub fn added_objects(&self) -> impl Iterator<Item = &ObjectId> {
        self.graph
            .iter()
            .map(|(id, _)| id)
            .filter(|id| !self.layout.originals.contains_key(*id))
    }

    pub(crate) fn layout(&self) -> &Layout {
        &self.layout
    }
}

fn decode_entry(key: String, mut value: Dict) -> Result<(ObjectId, Object), ParseError> {
    let invalid = |id: &str, source| ParseError::InvalidObject {
        id: id.to_string(),
        source,
    };
    let id = ObjectId::new(key.as_str()).map_err(|e| invalid(&key, e))?;
    let isa = match value.remove("isa") {
        Some(Value::String(isa)) => isa,
        _ => return Err(invalid(&key, ModelError::missing("object", "isa"))),
    };
    let object = Object::decode(&isa, value).map_err(|e| invalid(&key, e))?;
    Ok((id, object))
}

fn check_versions(top_level: &Dict) -> Result<(), ParseError> {
    let archive = top_level
        .get("archiveVersion")
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingKey("archiveVersion"))?;
    if archive != ARCHIVE_VERSION {
        return Err(ParseError::UnsupportedVersion(format!(
            "archiveVersion {archive}"
        )));
    }

    let object_version = top_level
        .get("objectVersion")
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingKey("objectVersion"))?;
    match object_version.parse::<u32>() {
        Ok(v) if SUPPORTED_OBJECT_VERSIONS.contains(&v) => Ok(()),
        _ => Err(ParseError::UnsupportedVersion(format!(
            "objectVersion {object_version}"
        ))),
    }
}

/// Parse project-file text
///
/// # Errors
/// See [`ProjectDocument::parse`].
pub fn load(source: &str) -> Result<ProjectDocument, ParseError> {
    ProjectDocument::parse(source)
}
