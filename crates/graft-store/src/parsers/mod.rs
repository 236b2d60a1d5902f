//! Parsers for the two file formats the store reads
//!
//! - Project files (`project.pbxproj`), OpenStep ASCII property lists
//! - Capability documents (`*.entitlements`), XML property lists

use std::path::Path;

use crate::capability::CapabilityDocument;
use crate::document::ProjectDocument;
use crate::error::ParseError;

mod openstep;
mod xml;

pub(crate) use openstep::{is_bare_byte, OpenStepParser, ParsedFile, Segment};
pub(crate) use xml::parse_with_key as xml_parse_with_key;

/// Parser trait for converting file content into a typed document
pub trait DocumentParser {
    /// Document type this parser produces
    type Output;

    /// Parse content string into a document
    ///
    /// # Errors
    /// Returns error on malformed or unsupported input.
    fn parse(&self, content: &str) -> Result<Self::Output, ParseError>;

    /// Supported file extensions (without dot)
    fn extensions(&self) -> &[&str];

    /// Check if this parser can handle the given path
    fn can_parse(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions().contains(&ext))
    }
}

/// `project.pbxproj` parser
#[derive(Debug, Clone, Copy, Default)]
pub struct PbxprojParser;

impl DocumentParser for PbxprojParser {
    type Output = ProjectDocument;

    fn parse(&self, content: &str) -> Result<ProjectDocument, ParseError> {
        ProjectDocument::parse(content)
    }

    fn extensions(&self) -> &[&str] {
        &["pbxproj"]
    }
}

/// Capability document parser
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityParser;

impl DocumentParser for CapabilityParser {
    type Output = CapabilityDocument;

    fn parse(&self, content: &str) -> Result<CapabilityDocument, ParseError> {
        xml::parse_capability(content)
    }

    fn extensions(&self) -> &[&str] {
        &["entitlements", "plist"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsers_match_by_extension() {
        assert!(PbxprojParser.can_parse(Path::new("App.xcodeproj/project.pbxproj")));
        assert!(!PbxprojParser.can_parse(Path::new("Info.plist")));
        assert!(CapabilityParser.can_parse(Path::new("Ext/Ext.entitlements")));
        assert!(!CapabilityParser.can_parse(Path::new("Ext/Handler.swift")));
    }
}
