//! OpenStep property-list parser
//!
//! Parses the ASCII property-list dialect used by `project.pbxproj`. The
//! `objects` dictionary is parsed span-preserving: every entry keeps its
//! exact source text and the trivia between entries (whitespace, section
//! markers) is kept verbatim, so untouched objects can be written back
//! byte for byte.

use std::collections::HashMap;

use graft_model::{Dict, Value};

use crate::error::ParseError;

/// One piece of the `objects` dictionary body
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    /// Whitespace and comments between entries
    Trivia(String),
    /// `KEY = { ... };`
    Entry {
        key: String,
        value: Dict,
        text: String,
    },
}

/// Result of parsing a whole project file
#[derive(Debug, Clone)]
pub(crate) struct ParsedFile {
    /// Source up to and including `objects = {`
    pub(crate) prefix: String,
    /// Body of the objects dictionary
    pub(crate) body: Vec<Segment>,
    /// Source from the closing `}` of objects to end of file
    pub(crate) suffix: String,
    /// All root keys except `objects`
    pub(crate) top_level: Dict,
    /// `/* comment */` found right after a string token, keyed by that token
    pub(crate) annotations: HashMap<String, String>,
}

/// Characters allowed in an unquoted string
pub(crate) fn is_bare_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"_$+/:.-".contains(&b)
}

pub(crate) struct OpenStepParser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    annotations: HashMap<String, String>,
}

impl<'a> OpenStepParser<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            annotations: HashMap::new(),
        }
    }

    pub(crate) fn parse_file(mut self) -> Result<ParsedFile, ParseError> {
        self.skip_trivia()?;
        self.expect(b'{')?;

        let mut top_level = Dict::new();
        let mut objects = None;
        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                None => return Err(self.error("unterminated root dictionary")),
                _ => {}
            }
            let key_pos = self.pos;
            let key = self.parse_string()?;
            self.skip_trivia()?;
            self.expect(b'=')?;
            self.skip_trivia()?;
            if key == "objects" {
                if objects.is_some() {
                    return Err(self.error_at(key_pos, "duplicate 'objects' dictionary"));
                }
                self.expect(b'{')?;
                let body_start = self.pos;
                let body = self.parse_object_body()?;
                let body_end = self.pos;
                self.expect(b'}')?;
                objects = Some((body_start, body, body_end));
            } else {
                let value = self.parse_value()?;
                top_level.insert(key, value);
            }
            self.skip_trivia()?;
            self.expect(b';')?;
        }

        self.skip_trivia()?;
        if self.pos < self.bytes.len() {
            return Err(self.error("trailing content after root dictionary"));
        }

        let (body_start, body, body_end) = objects.ok_or(ParseError::MissingKey("objects"))?;
        Ok(ParsedFile {
            prefix: self.src[..body_start].to_string(),
            body,
            suffix: self.src[body_end..].to_string(),
            top_level,
            annotations: self.annotations,
        })
    }

    fn parse_object_body(&mut self) -> Result<Vec<Segment>, ParseError> {
        let mut segments = Vec::new();
        loop {
            let gap_start = self.pos;
            self.skip_trivia()?;
            if self.pos > gap_start {
                segments.push(Segment::Trivia(self.src[gap_start..self.pos].to_string()));
            }
            match self.peek() {
                Some(b'}') => return Ok(segments),
                None => return Err(self.error("unterminated objects dictionary")),
                _ => {}
            }

            let start = self.pos;
            let key = self.parse_string()?;
            self.skip_trivia()?;
            self.expect(b'=')?;
            self.skip_trivia()?;
            let value = match self.parse_value()? {
                Value::Dict(d) => d,
                other => {
                    return Err(self.error_at(
                        start,
                        format!("object {key} is a {}, expected dictionary", other.kind_name()),
                    ))
                }
            };
            self.skip_trivia()?;
            self.expect(b';')?;
            segments.push(Segment::Entry {
                key,
                value,
                text: self.src[start..self.pos].to_string(),
            });
        }
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        match self.peek() {
            Some(b'{') => self.parse_dict().map(Value::Dict),
            Some(b'(') => self.parse_array().map(Value::Array),
            Some(b'<') => self.parse_data().map(Value::Data),
            Some(_) => self.parse_string().map(Value::String),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_dict(&mut self) -> Result<Dict, ParseError> {
        self.expect(b'{')?;
        let mut dict = Dict::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(dict);
            }
            let key = self.parse_string()?;
            self.skip_trivia()?;
            self.expect(b'=')?;
            self.skip_trivia()?;
            let value = self.parse_value()?;
            self.skip_trivia()?;
            self.expect(b';')?;
            dict.insert(key, value);
        }
    }

    fn parse_array(&mut self) -> Result<Vec<Value>, ParseError> {
        self.expect(b'(')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(b')') {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.parse_value()?);
            self.skip_trivia()?;
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {}
                _ => return Err(self.error("expected ',' or ')' in array")),
            }
        }
    }

    fn parse_data(&mut self) -> Result<Vec<u8>, ParseError> {
        let start = self.pos;
        self.expect(b'<')?;
        let Some(len) = self.src[self.pos..].find('>') else {
            return Err(self.error_at(start, "unterminated data"));
        };
        let digits: String = self.src[self.pos..self.pos + len]
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        self.pos += len + 1;
        hex::decode(digits).map_err(|e| self.error_at(start, format!("invalid data: {e}")))
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        let value = match self.peek() {
            Some(b'"') => self.parse_quoted()?,
            Some(b) if is_bare_byte(b) => self.parse_bare(),
            Some(b) => return Err(self.error(format!("unexpected character '{}'", b as char))),
            None => return Err(self.error("unexpected end of input")),
        };
        self.capture_annotation(&value);
        Ok(value)
    }

    fn parse_bare(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_bare_byte) {
            self.pos += 1;
        }
        self.src[start..self.pos].to_string()
    }

    fn parse_quoted(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        let mut chars = self.src[self.pos..].char_indices();
        while let Some((offset, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += offset + 1;
                    return Ok(out);
                }
                '\\' => {
                    let Some((_, escaped)) = chars.next() else {
                        break;
                    };
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '"' | '\\' | '\'' => out.push(escaped),
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                other => out.push(other),
            }
        }
        Err(self.error_at(start, "unterminated string"))
    }

    /// Remember `/* comment */` following a token on the same line
    fn capture_annotation(&mut self, token: &str) {
        let rest = &self.src[self.pos..];
        let rest = rest.trim_start_matches([' ', '\t']);
        let Some(body) = rest.strip_prefix("/*") else {
            return;
        };
        if let Some(end) = body.find("*/") {
            self.annotations
                .entry(token.to_string())
                .or_insert_with(|| body[..end].trim().to_string());
        }
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.pos;
                    match self.src[self.pos + 2..].find("*/") {
                        Some(len) => self.pos += 2 + len + 2,
                        None => return Err(self.error_at(start, "unterminated comment")),
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    match self.src[self.pos..].find('\n') {
                        Some(len) => self.pos += len + 1,
                        None => self.pos = self.bytes.len(),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), ParseError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", byte as char)))
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    #[inline]
    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> ParseError {
        let before = &self.src[..pos.min(self.src.len())];
        let line = before.matches('\n').count() + 1;
        let column = before.rfind('\n').map_or(before.len(), |nl| before.len() - nl - 1) + 1;
        ParseError::Syntax {
            line,
            column,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Result<ParsedFile, ParseError> {
        OpenStepParser::new(src).parse_file()
    }

    const SMALL: &str = "// !$*UTF8*$!\n{\n\tarchiveVersion = 1;\n\tobjects = {\n\n/* Begin PBXGroup section */\n\t\tAAA /* App */ = {\n\t\t\tisa = PBXGroup;\n\t\t\tchildren = (\n\t\t\t);\n\t\t\tpath = App;\n\t\t\tsourceTree = \"<group>\";\n\t\t};\n/* End PBXGroup section */\n\t};\n\trootObject = AAA /* App */;\n}\n";

    #[test]
    fn splits_objects_body_into_trivia_and_entries() {
        let parsed = parse(SMALL).unwrap();
        assert!(parsed.prefix.ends_with("objects = {"));
        assert!(parsed.suffix.starts_with("};\n\trootObject"));
        assert_eq!(parsed.body.len(), 3);
        match &parsed.body[1] {
            Segment::Entry { key, value, text } => {
                assert_eq!(key, "AAA");
                assert_eq!(value.get("path"), Some(&Value::from("App")));
                assert!(text.starts_with("AAA /* App */ = {"));
                assert!(text.ends_with("};"));
            }
            other => panic!("expected entry, got {other:?}"),
        }
    }

    #[test]
    fn reassembles_source_exactly() {
        let parsed = parse(SMALL).unwrap();
        let mut rebuilt = parsed.prefix.clone();
        for segment in &parsed.body {
            match segment {
                Segment::Trivia(t) => rebuilt.push_str(t),
                Segment::Entry { text, .. } => rebuilt.push_str(text),
            }
        }
        rebuilt.push_str(&parsed.suffix);
        assert_eq!(rebuilt, SMALL);
    }

    #[test]
    fn records_annotations() {
        let parsed = parse(SMALL).unwrap();
        assert_eq!(parsed.annotations.get("AAA").map(String::as_str), Some("App"));
    }

    #[test]
    fn unescapes_quoted_strings() {
        let parsed = parse("{ a = \"x \\\"y\\\"\\n\"; objects = { }; }").unwrap();
        assert_eq!(parsed.top_level.get("a"), Some(&Value::from("x \"y\"\n")));
    }

    #[test]
    fn parses_data_and_nested_arrays() {
        let parsed = parse("{ d = <0A ff>; l = (a, (b, c), ); objects = { }; }").unwrap();
        assert_eq!(parsed.top_level.get("d"), Some(&Value::Data(vec![0x0a, 0xff])));
        let list = parsed.top_level.get("l").and_then(Value::as_array).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn missing_objects_is_reported() {
        assert!(matches!(
            parse("{ archiveVersion = 1; }"),
            Err(ParseError::MissingKey("objects"))
        ));
    }

    #[test]
    fn reports_position_of_syntax_errors() {
        let err = parse("{\n  a = ;\n}").unwrap_err();
        match err {
            ParseError::Syntax { line, column, .. } => {
                assert_eq!(line, 2);
                assert_eq!(column, 7);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_unterminated_comment() {
        assert!(parse("{ /* never closed").is_err());
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse("{ objects = { }; } extra").is_err());
    }
}
