//! Xcode-style rendering
//!
//! [`serialize`] re-emits every object that still equals its parsed form
//! from its original text, re-renders changed objects, and slots new
//! objects into their `/* Begin <isa> section */` block in identifier
//! order. Sections that do not exist yet are created at their sorted
//! position.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use graft_model::{Dict, Object, ObjectId, ProjectGraph, Value};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::{Item, ProjectDocument};

static SECTION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\* (Begin|End) (\w+) section \*/").expect("valid regex"));

/// True when `s` must be written in double quotes
pub(crate) fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || !s.bytes().all(|b| b.is_ascii_alphanumeric() || b"_$./".contains(&b))
        || s.contains("//")
        || s.contains("___")
}

/// Quote and escape `s` if needed
pub(crate) fn quote(s: &str) -> Cow<'_, str> {
    if !needs_quotes(s) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    Cow::Owned(out)
}

fn push_tabs(out: &mut String, n: usize) {
    out.extend(std::iter::repeat('\t').take(n));
}

/// `isa` first, everything else in key order
fn ordered(dict: &Dict) -> impl Iterator<Item = (&String, &Value)> {
    dict.get_key_value("isa")
        .into_iter()
        .chain(dict.iter().filter(|(k, _)| k.as_str() != "isa"))
}

pub(crate) struct Renderer<'a> {
    graph: &'a ProjectGraph,
    annotations: &'a HashMap<String, String>,
    phase_of: HashMap<&'a ObjectId, &'a ObjectId>,
    list_owner: HashMap<&'a ObjectId, (&'static str, &'a str)>,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(graph: &'a ProjectGraph, annotations: &'a HashMap<String, String>) -> Self {
        let mut phase_of = HashMap::new();
        let mut list_owner = HashMap::new();
        for (id, object) in graph.iter() {
            match object {
                Object::BuildPhase(phase) => {
                    for file in &phase.files {
                        phase_of.entry(file).or_insert(id);
                    }
                }
                Object::Target(target) => {
                    list_owner.insert(
                        &target.build_configuration_list,
                        (target.kind.isa(), target.name.as_str()),
                    );
                }
                _ => {}
            }
        }
        Self {
            graph,
            annotations,
            phase_of,
            list_owner,
        }
    }

    /// Comment written after `id`: the one read from the file, else derived
    pub(crate) fn annotation(&self, id: &ObjectId) -> Option<String> {
        if let Some(known) = self.annotations.get(id.as_str()) {
            return Some(known.clone());
        }
        match self.graph.get(id)? {
            Object::Project(_) => Some("Project object".to_string()),
            Object::Target(t) => Some(t.name.clone()),
            Object::Group(g) => g.display_name().map(str::to_string),
            Object::FileReference(r) => r.display_name().map(str::to_string),
            Object::BuildFile(b) => {
                let file = self.annotation(b.file_ref.as_ref()?)?;
                let phase = self.annotation(self.phase_of.get(id)?)?;
                Some(format!("{file} in {phase}"))
            }
            Object::BuildPhase(p) => Some(p.display_name().to_string()),
            Object::BuildConfiguration(c) => Some(c.name.clone()),
            Object::ConfigurationList(_) => self
                .list_owner
                .get(id)
                .map(|(isa, name)| format!("Build configuration list for {isa} \"{name}\"")),
            Object::ContainerItemProxy(_) => Some("PBXContainerItemProxy".to_string()),
            Object::TargetDependency(_) => Some("PBXTargetDependency".to_string()),
            Object::Opaque(_) => None,
        }
    }

    fn push_id(&self, out: &mut String, id: &ObjectId) {
        out.push_str(id.as_str());
        if let Some(note) = self.annotation(id) {
            out.push_str(" /* ");
            out.push_str(&note);
            out.push_str(" */");
        }
    }

    /// Identifiers are annotated only under the object's reference keys
    fn push_scalar(&self, out: &mut String, s: &str, reference: bool) {
        match ObjectId::new(s) {
            Ok(id) if reference => self.push_id(out, &id),
            _ => out.push_str(&quote(s)),
        }
    }

    /// `ID /* note */ = { ... };`
    pub(crate) fn render_entry(&self, id: &ObjectId, object: &Object) -> String {
        let dict = object.encode();
        let keys = object.reference_keys();
        let mut out = String::new();
        self.push_id(&mut out, id);
        out.push_str(" = ");
        if matches!(object, Object::BuildFile(_) | Object::FileReference(_)) {
            self.push_inline_dict(&mut out, &dict, keys);
        } else {
            self.push_block_dict(&mut out, &dict, 2, keys);
        }
        out.push(';');
        out
    }

    fn push_block_dict(&self, out: &mut String, dict: &Dict, indent: usize, keys: &[&str]) {
        out.push_str("{\n");
        for (key, value) in ordered(dict) {
            push_tabs(out, indent + 1);
            out.push_str(&quote(key));
            out.push_str(" = ");
            self.push_block_value(out, value, indent + 1, keys.contains(&key.as_str()));
            out.push_str(";\n");
        }
        push_tabs(out, indent);
        out.push('}');
    }

    fn push_block_value(&self, out: &mut String, value: &Value, indent: usize, reference: bool) {
        match value {
            Value::String(s) => self.push_scalar(out, s, reference),
            Value::Array(items) => {
                out.push_str("(\n");
                for item in items {
                    push_tabs(out, indent + 1);
                    self.push_block_value(out, item, indent + 1, reference);
                    out.push_str(",\n");
                }
                push_tabs(out, indent);
                out.push(')');
            }
            Value::Dict(d) => self.push_block_dict(out, d, indent, &[]),
            Value::Data(bytes) => push_data(out, bytes),
        }
    }

    fn push_inline_dict(&self, out: &mut String, dict: &Dict, keys: &[&str]) {
        out.push('{');
        for (key, value) in ordered(dict) {
            out.push_str(&quote(key));
            out.push_str(" = ");
            self.push_inline_value(out, value, keys.contains(&key.as_str()));
            out.push_str("; ");
        }
        out.push('}');
    }

    fn push_inline_value(&self, out: &mut String, value: &Value, reference: bool) {
        match value {
            Value::String(s) => self.push_scalar(out, s, reference),
            Value::Array(items) => {
                out.push('(');
                for item in items {
                    self.push_inline_value(out, item, reference);
                    out.push_str(", ");
                }
                out.push(')');
            }
            Value::Dict(d) => self.push_inline_dict(out, d, &[]),
            Value::Data(bytes) => push_data(out, bytes),
        }
    }
}

fn push_data(out: &mut String, bytes: &[u8]) {
    out.push('<');
    out.push_str(&hex::encode(bytes));
    out.push('>');
}

type Queue<'a> = VecDeque<(&'a ObjectId, String)>;

fn push_section(out: &mut String, isa: &str, entries: Queue<'_>) {
    out.push_str("/* Begin ");
    out.push_str(isa);
    out.push_str(" section */\n");
    for (_, text) in entries {
        out.push_str("\t\t");
        out.push_str(&text);
        out.push('\n');
    }
    out.push_str("/* End ");
    out.push_str(isa);
    out.push_str(" section */\n");
}

/// Emit whatever could not be placed inside an existing section
fn push_leftovers<'a>(
    out: &mut String,
    pending: &mut BTreeMap<&'a str, Queue<'a>>,
    missing: &mut BTreeMap<&'a str, Queue<'a>>,
) {
    for (_, queue) in std::mem::take(pending) {
        for (_, text) in queue {
            out.push_str("\t\t");
            out.push_str(&text);
            out.push('\n');
        }
    }
    for (isa, queue) in std::mem::take(missing) {
        out.push('\n');
        push_section(out, isa, queue);
    }
}

fn line_start(text: &str, at: usize) -> usize {
    text[..at].rfind('\n').map_or(0, |nl| nl + 1)
}

/// Serialize a document to project-file text
#[must_use]
pub fn serialize(doc: &ProjectDocument) -> String {
    let graph = doc.graph();
    let layout = doc.layout();
    let renderer = Renderer::new(graph, &layout.annotations);

    let present: HashSet<&str> = layout
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Trivia(text) => Some(text.as_str()),
            Item::Entry(_) => None,
        })
        .flat_map(|text| SECTION_MARKER.captures_iter(text))
        .filter(|caps| caps.get(1).is_some_and(|m| m.as_str() == "Begin"))
        .filter_map(|caps| caps.get(2).map(|m| m.as_str()))
        .collect();

    let mut added: Vec<(&ObjectId, &Object)> = graph
        .iter()
        .filter(|(id, _)| !layout.originals.contains_key(*id))
        .collect();
    added.sort_by(|a, b| a.0.cmp(b.0));

    let mut pending: BTreeMap<&str, Queue<'_>> = BTreeMap::new();
    let mut missing: BTreeMap<&str, Queue<'_>> = BTreeMap::new();
    for (id, object) in added {
        let target = if present.contains(object.isa()) {
            &mut pending
        } else {
            &mut missing
        };
        target
            .entry(object.isa())
            .or_default()
            .push_back((id, renderer.render_entry(id, object)));
    }

    let mut out = String::with_capacity(layout.prefix.len() + layout.suffix.len() + 64 * graph.len());
    out.push_str(&layout.prefix);

    let last = layout.items.len().saturating_sub(1);
    for (index, item) in layout.items.iter().enumerate() {
        match item {
            Item::Entry(id) => {
                let Some(object) = graph.get(id) else {
                    continue;
                };
                if let Some(queue) = pending.get_mut(object.isa()) {
                    while queue.front().is_some_and(|(new_id, _)| *new_id < id) {
                        if let Some((_, text)) = queue.pop_front() {
                            out.push_str(&text);
                            out.push_str("\n\t\t");
                        }
                    }
                }
                match layout.originals.get(id) {
                    Some(original) if original.object == *object => out.push_str(&original.text),
                    _ => out.push_str(&renderer.render_entry(id, object)),
                }
            }
            Item::Trivia(text) => {
                let mut cursor = 0;
                for caps in SECTION_MARKER.captures_iter(text) {
                    let (Some(marker), Some(kind), Some(isa)) = (caps.get(0), caps.get(1), caps.get(2))
                    else {
                        continue;
                    };
                    let at = line_start(text, marker.start()).max(cursor);
                    out.push_str(&text[cursor..at]);
                    cursor = at;
                    if kind.as_str() == "End" {
                        if let Some(queue) = pending.remove(isa.as_str()) {
                            for (_, entry) in queue {
                                out.push_str("\t\t");
                                out.push_str(&entry);
                                out.push('\n');
                            }
                        }
                    } else {
                        while let Some(first) = missing.first_entry() {
                            if *first.key() >= isa.as_str() {
                                break;
                            }
                            let (name, queue) = first.remove_entry();
                            push_section(&mut out, name, queue);
                            out.push('\n');
                        }
                    }
                }
                if index == last && !(pending.is_empty() && missing.is_empty()) {
                    let rest = &text[cursor..];
                    let split = cursor + rest.rfind('\n').map_or(0, |nl| nl + 1);
                    out.push_str(&text[cursor..split]);
                    push_leftovers(&mut out, &mut pending, &mut missing);
                    cursor = split;
                }
                out.push_str(&text[cursor..]);
            }
        }
    }
    push_leftovers(&mut out, &mut pending, &mut missing);

    out.push_str(&layout.suffix);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_model::{BuildFile, FileReference, PhaseKind};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use crate::document::load;

    const PROJECT: &str = "// !$*UTF8*$!\n{\n\tarchiveVersion = 1;\n\tclasses = {\n\t};\n\tobjectVersion = 56;\n\tobjects = {\n\n\
/* Begin PBXFileReference section */\n\
\t\tF00000000000000000000001 /* App.swift */ = {isa = PBXFileReference; lastKnownFileType = sourcecode.swift; path = App.swift; sourceTree = \"<group>\"; };\n\
/* End PBXFileReference section */\n\n\
/* Begin PBXGroup section */\n\
\t\tG00000000000000000000001 = {\n\t\t\tisa = PBXGroup;\n\t\t\tchildren = (\n\t\t\t\tF00000000000000000000001 /* App.swift */,\n\t\t\t);\n\t\t\tsourceTree = \"<group>\";\n\t\t};\n\
/* End PBXGroup section */\n\n\
/* Begin PBXProject section */\n\
\t\tP00000000000000000000001 /* Project object */ = {\n\t\t\tisa = PBXProject;\n\t\t\tbuildConfigurationList = L00000000000000000000001 /* Build configuration list for PBXProject \"App\" */;\n\t\t\tmainGroup = G00000000000000000000001;\n\t\t\ttargets = (\n\t\t\t);\n\t\t};\n\
/* End PBXProject section */\n\n\
/* Begin XCConfigurationList section */\n\
\t\tL00000000000000000000001 /* Build configuration list for PBXProject \"App\" */ = {\n\t\t\tisa = XCConfigurationList;\n\t\t\tbuildConfigurations = (\n\t\t\t);\n\t\t\tdefaultConfigurationIsVisible = 0;\n\t\t};\n\
/* End XCConfigurationList section */\n\
\t};\n\trootObject = P00000000000000000000001 /* Project object */;\n}\n";

    fn id(s: &str) -> ObjectId {
        ObjectId::new(s).unwrap()
    }

    #[test]
    fn untouched_document_round_trips() {
        let doc = load(PROJECT).unwrap();
        assert_eq!(serialize(&doc), PROJECT);
    }

    #[test]
    fn changed_object_is_rerendered_in_place() {
        let mut doc = load(PROJECT).unwrap();
        doc.graph_mut()
            .group_mut(&id("G00000000000000000000001"))
            .unwrap()
            .name = Some("App".into());
        let text = serialize(&doc);
        assert!(text.contains(
            "\t\tG00000000000000000000001 /* App */ = {\n\t\t\tisa = PBXGroup;\n\t\t\tchildren = (\n\t\t\t\tF00000000000000000000001 /* App.swift */,\n\t\t\t);\n\t\t\tname = App;\n\t\t\tsourceTree = \"<group>\";\n\t\t};\n"
        ));
        assert!(load(&text).is_ok());
    }

    #[test]
    fn new_object_lands_in_existing_section_in_id_order() {
        let mut doc = load(PROJECT).unwrap();
        doc.graph_mut()
            .insert_with_id(id("A00000000000000000000001"), FileReference::source("A.swift", "sourcecode.swift"))
            .unwrap();
        doc.graph_mut()
            .insert_with_id(id("Z00000000000000000000001"), FileReference::source("Z.swift", "sourcecode.swift"))
            .unwrap();
        let text = serialize(&doc);
        let expected = "/* Begin PBXFileReference section */\n\
\t\tA00000000000000000000001 /* A.swift */ = {isa = PBXFileReference; lastKnownFileType = sourcecode.swift; path = A.swift; sourceTree = \"<group>\"; };\n\
\t\tF00000000000000000000001 /* App.swift */ = {isa = PBXFileReference; lastKnownFileType = sourcecode.swift; path = App.swift; sourceTree = \"<group>\"; };\n\
\t\tZ00000000000000000000001 /* Z.swift */ = {isa = PBXFileReference; lastKnownFileType = sourcecode.swift; path = Z.swift; sourceTree = \"<group>\"; };\n\
/* End PBXFileReference section */\n";
        assert!(text.contains(expected), "{text}");
    }

    #[test]
    fn missing_section_created_in_sorted_position() {
        let mut doc = load(PROJECT).unwrap();
        let file = id("F00000000000000000000001");
        let build_file = id("B00000000000000000000001");
        doc.graph_mut()
            .insert_with_id(build_file.clone(), BuildFile::wrapping(file))
            .unwrap();
        let mut phase = graft_model::BuildPhase::new(PhaseKind::Sources);
        phase.files.push(build_file);
        doc.graph_mut()
            .insert_with_id(id("S00000000000000000000001"), phase)
            .unwrap();

        let text = serialize(&doc);
        let build_files = text.find("/* Begin PBXBuildFile section */").unwrap();
        let file_refs = text.find("/* Begin PBXFileReference section */").unwrap();
        let sources = text.find("/* Begin PBXSourcesBuildPhase section */").unwrap();
        let configs = text.find("/* Begin XCConfigurationList section */").unwrap();
        assert!(build_files < file_refs);
        assert!(sources > text.find("/* End PBXProject section */").unwrap());
        assert!(sources < configs);
        assert!(text.contains(
            "/* Begin PBXBuildFile section */\n\t\tB00000000000000000000001 /* App.swift in Sources */ = {isa = PBXBuildFile; fileRef = F00000000000000000000001 /* App.swift */; };\n/* End PBXBuildFile section */\n\n/* Begin PBXFileReference section */"
        ));
        assert!(load(&text).is_ok());
    }

    #[test]
    fn section_between_existing_ones() {
        let mut doc = load(PROJECT).unwrap();
        doc.graph_mut()
            .insert_with_id(id("X00000000000000000000001"), graft_model::BuildConfiguration::new("Debug"))
            .unwrap();
        let text = serialize(&doc);
        assert!(text.contains(
            "/* End XCBuildConfiguration section */\n\n/* Begin XCConfigurationList section */"
        ));
        let reparsed = load(&text).unwrap();
        assert_eq!(reparsed.graph().len(), doc.graph().len());
        assert_eq!(serialize(&reparsed), text);
    }

    #[test]
    fn section_after_all_existing_is_appended() {
        let mut doc = load(PROJECT).unwrap();
        let opaque = graft_model::Opaque {
            isa: "XCVersionGroup".into(),
            fields: Dict::new(),
        };
        doc.graph_mut()
            .insert_with_id(id("V00000000000000000000001"), Object::Opaque(opaque))
            .unwrap();
        let text = serialize(&doc);
        assert!(text.ends_with(
            "/* End XCConfigurationList section */\n\n/* Begin XCVersionGroup section */\n\t\tV00000000000000000000001 = {\n\t\t\tisa = XCVersionGroup;\n\t\t};\n/* End XCVersionGroup section */\n\t};\n\trootObject = P00000000000000000000001 /* Project object */;\n}\n"
        ));
    }

    #[test]
    fn inline_settings_render() {
        let doc = load(PROJECT).unwrap();
        let mut settings = Dict::new();
        settings.insert(
            "ATTRIBUTES".into(),
            Value::Array(vec![Value::from("RemoveHeadersOnCopy")]),
        );
        let build = BuildFile::wrapping(id("F00000000000000000000001")).with_settings(settings);
        let renderer = Renderer::new(doc.graph(), &doc.layout().annotations);
        let text = renderer.render_entry(&id("B1"), &Object::from(build));
        assert_eq!(
            text,
            "B1 = {isa = PBXBuildFile; fileRef = F00000000000000000000001 /* App.swift */; settings = {ATTRIBUTES = (RemoveHeadersOnCopy, ); }; };"
        );
    }

    #[test]
    fn only_reference_keys_are_annotated() {
        let doc = load(PROJECT).unwrap();
        let renderer = Renderer::new(doc.graph(), &doc.layout().annotations);

        let named_like_id = FileReference::source("F00000000000000000000001", "text");
        let text = renderer.render_entry(&id("A1"), &Object::from(named_like_id));
        assert_eq!(
            text,
            "A1 = {isa = PBXFileReference; lastKnownFileType = text; path = F00000000000000000000001; sourceTree = \"<group>\"; };"
        );

        let mut config = graft_model::BuildConfiguration::new("Debug");
        config.build_settings.insert(
            "TEST_HOST".into(),
            graft_model::SettingValue::text("G00000000000000000000001"),
        );
        let text = renderer.render_entry(&id("C1"), &Object::from(config));
        assert!(text.contains("TEST_HOST = G00000000000000000000001;"), "{text}");

        let mut group = graft_model::Group::folder("App");
        group.children.push(id("F00000000000000000000001"));
        let text = renderer.render_entry(&id("G2"), &Object::from(group));
        assert!(text.contains("F00000000000000000000001 /* App.swift */,"), "{text}");
    }

    #[test]
    fn quoting_rules() {
        assert_eq!(quote("sourcecode.swift"), "sourcecode.swift");
        assert_eq!(quote("$(SRCROOT)/x"), "\"$(SRCROOT)/x\"");
        assert_eq!(quote("wrapper.app-extension"), "\"wrapper.app-extension\"");
        assert_eq!(quote(""), "\"\"");
        assert_eq!(quote("a//b"), "\"a//b\"");
        assert_eq!(quote("___VAR"), "\"___VAR\"");
        assert_eq!(quote("say \"hi\"\n"), "\"say \\\"hi\\\"\\n\"");
    }

    proptest! {
        #[test]
        fn quoted_strings_parse_back(s in "[ -~\n\t]{0,24}") {
            let text = format!("{{ archiveVersion = 1; objectVersion = 56; k = {}; objects = {{ }}; }}", quote(&s));
            let parsed = crate::parsers::OpenStepParser::new(&text).parse_file().unwrap();
            prop_assert_eq!(parsed.top_level.get("k").and_then(Value::as_str), Some(s.as_str()));
        }
    }
}
