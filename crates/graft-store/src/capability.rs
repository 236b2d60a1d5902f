//! Capability (entitlements) document codec

use std::fmt::Write as _;

use crate::error::ParseError;
use crate::parsers::{CapabilityParser, DocumentParser};

/// Key granting shared app-group containers
pub const APP_GROUPS_KEY: &str = "com.apple.security.application-groups";

const HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n\
<plist version=\"1.0\">\n";

/// An entitlements document holding one string-array capability
///
/// Entries under other keys read from an existing file are carried as raw
/// XML and rendered back unchanged, in their original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityDocument {
    key: String,
    groups: Vec<String>,
    preserved: Vec<(String, String)>,
    position: usize,
}

impl CapabilityDocument {
    /// Document with `groups` under `key`, duplicates dropped
    #[must_use]
    pub fn new<I, S>(key: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_preserved(key, groups, Vec::new(), 0)
    }

    /// `preserved` holds `(key, raw value)` pairs; the capability entry is
    /// rendered before `preserved[position]`
    pub(crate) fn with_preserved<I, S>(
        key: impl Into<String>,
        groups: I,
        preserved: Vec<(String, String)>,
        position: usize,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let position = position.min(preserved.len());
        let mut doc = Self {
            key: key.into(),
            groups: Vec::new(),
            preserved,
            position,
        };
        doc.merge(groups);
        doc
    }

    /// App-group document
    #[must_use]
    pub fn app_groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(APP_GROUPS_KEY, groups)
    }

    /// Read an existing document, looking for the app-group key
    ///
    /// # Errors
    /// Returns error if the text is not an XML property list.
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        CapabilityParser.parse(content)
    }

    /// Read an existing document, looking for `key`
    ///
    /// # Errors
    /// Returns error if the text is not an XML property list.
    pub fn parse_with_key(content: &str, key: &str) -> Result<Self, ParseError> {
        crate::parsers::xml_parse_with_key(content, key)
    }

    /// Capability key
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Groups in insertion order
    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Keys of the other entries kept from the parsed file
    pub fn other_keys(&self) -> impl Iterator<Item = &str> {
        self.preserved.iter().map(|(key, _)| key.as_str())
    }

    /// Set-union `groups` into the document, keeping existing order
    ///
    /// Returns true when anything was added.
    pub fn merge<I, S>(&mut self, groups: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let before = self.groups.len();
        for group in groups {
            let group = group.into();
            if !self.groups.contains(&group) {
                self.groups.push(group);
            }
        }
        self.groups.len() != before
    }

    /// Deterministic XML rendering
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::from(HEADER);
        out.push_str("<dict>\n");
        let (before, after) = self.preserved.split_at(self.position);
        for (key, raw) in before {
            let _ = writeln!(out, "\t<key>{}</key>\n\t{raw}", escape_xml(key));
        }
        let _ = writeln!(out, "\t<key>{}</key>", escape_xml(&self.key));
        if self.groups.is_empty() {
            out.push_str("\t<array/>\n");
        } else {
            out.push_str("\t<array>\n");
            for group in &self.groups {
                let _ = writeln!(out, "\t\t<string>{}</string>", escape_xml(group));
            }
            out.push_str("\t</array>\n");
        }
        for (key, raw) in after {
            let _ = writeln!(out, "\t<key>{}</key>\n\t{raw}", escape_xml(key));
        }
        out.push_str("</dict>\n</plist>\n");
        out
    }
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

pub(crate) fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_expected_layout() {
        let doc = CapabilityDocument::app_groups(["group.com.gormantec.simplehealth"]);
        assert_eq!(
            doc.render(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n\
<plist version=\"1.0\">\n\
<dict>\n\
\t<key>com.apple.security.application-groups</key>\n\
\t<array>\n\
\t\t<string>group.com.gormantec.simplehealth</string>\n\
\t</array>\n\
</dict>\n\
</plist>\n"
        );
    }

    #[test]
    fn merge_is_set_union() {
        let mut doc = CapabilityDocument::app_groups(["group.a"]);
        assert!(!doc.merge(["group.a"]));
        assert!(doc.merge(["group.b", "group.a"]));
        assert_eq!(doc.groups(), ["group.a", "group.b"]);
    }

    #[test]
    fn render_then_parse_preserves_groups() {
        let doc = CapabilityDocument::app_groups(["group.a", "group.<odd>&"]);
        assert_eq!(CapabilityDocument::parse(&doc.render()).unwrap(), doc);
    }

    #[test]
    fn rendering_is_deterministic() {
        let a = CapabilityDocument::app_groups(["x", "y"]);
        let b = CapabilityDocument::app_groups(["x", "y", "x"]);
        assert_eq!(a.render(), b.render());
    }

    #[test]
    fn custom_key_parses_back() {
        let doc = CapabilityDocument::new("com.example.shared", ["one"]);
        let back = CapabilityDocument::parse_with_key(&doc.render(), "com.example.shared").unwrap();
        assert_eq!(back, doc);
    }
}
