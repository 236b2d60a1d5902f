//! Capability document reader
//!
//! Reads the top-level `<dict>` of an XML property list as a sequence of
//! `<key>` / value pairs. The value under the capability key must be an
//! `<array>` of `<string>` elements; values under other keys are kept as
//! raw text so a rewrite reproduces them. Comments, CDATA, processing
//! instructions inside the dict, and unknown elements are rejected rather
//! than guessed at.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::capability::{unescape_xml, CapabilityDocument, APP_GROUPS_KEY};
use crate::error::ParseError;

static PLIST_ROOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<plist[^>]*>\s*(?:<dict>(.*)</dict>|<dict\s*/>)\s*</plist>").expect("valid regex")
});

static KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<key>([^<]*)</key>").expect("valid regex"));

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(/?)([A-Za-z]+)[^>]*?(/?)>").expect("valid regex"));

static STRING_ARRAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(?:<array\s*/>|<array>(?:\s*<string>[^<]*</string>)*\s*</array>)$").expect("valid regex")
});

static STRING_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"<string>([^<]*)</string>").expect("valid regex"));

const ELEMENTS: &[&str] = &[
    "array", "dict", "key", "string", "true", "false", "integer", "real", "date", "data",
];

fn malformed(reason: impl Into<String>) -> ParseError {
    ParseError::MalformedCapability(reason.into())
}

pub(super) fn parse_capability(content: &str) -> Result<CapabilityDocument, ParseError> {
    parse_with_key(content, APP_GROUPS_KEY)
}

/// Read the string array stored under `key`; a document without the key
/// yields an empty group list placed after the other entries.
pub(crate) fn parse_with_key(content: &str, key: &str) -> Result<CapabilityDocument, ParseError> {
    let body = PLIST_ROOT
        .captures(content)
        .ok_or_else(|| malformed("no <plist><dict> root"))?
        .get(1)
        .map_or("", |m| m.as_str());
    for marker in ["<!--", "<![CDATA[", "<?"] {
        if body.contains(marker) {
            return Err(malformed(format!("unsupported markup '{marker}' inside <dict>")));
        }
    }

    let mut groups = None;
    let mut preserved = Vec::new();
    let mut position = 0;
    for (entry_key, value) in entries(body)? {
        if entry_key != key {
            preserved.push((entry_key, value.to_string()));
            continue;
        }
        if groups.is_some() {
            return Err(malformed(format!("key '{key}' appears twice")));
        }
        if !STRING_ARRAY.is_match(value) {
            return Err(malformed(format!("value of '{key}' is not an array of strings")));
        }
        groups = Some(
            STRING_ITEM
                .captures_iter(value)
                .map(|s| unescape_xml(&s[1]))
                .collect::<Vec<_>>(),
        );
        position = preserved.len();
    }
    if groups.is_none() {
        position = preserved.len();
    }

    Ok(CapabilityDocument::with_preserved(
        key,
        groups.unwrap_or_default(),
        preserved,
        position,
    ))
}

/// Top-level `(key, raw value)` pairs of a dict body
fn entries(body: &str) -> Result<Vec<(String, &str)>, ParseError> {
    let mut out = Vec::new();
    let mut rest = body.trim_start();
    while !rest.is_empty() {
        let caps = KEY
            .captures(rest)
            .ok_or_else(|| malformed("expected <key> inside <dict>"))?;
        let key = unescape_xml(&caps[1]);
        rest = rest[caps[0].len()..].trim_start();
        let len = element_len(rest).map_err(|reason| malformed(format!("value of '{key}': {reason}")))?;
        out.push((key, &rest[..len]));
        rest = rest[len..].trim_start();
    }
    Ok(out)
}

/// Length of the single element at the start of `text`
fn element_len(text: &str) -> Result<usize, String> {
    let mut open: Vec<&str> = Vec::new();
    for caps in TAG.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        if open.is_empty() && whole.start() != 0 {
            return Err("expected an element".into());
        }
        let name = name.as_str();
        if !ELEMENTS.contains(&name) {
            return Err(format!("unsupported element <{name}>"));
        }
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let self_closing = caps.get(3).is_some_and(|m| !m.as_str().is_empty());
        if closing {
            if open.pop() != Some(name) {
                return Err(format!("unbalanced </{name}>"));
            }
        } else if !self_closing {
            open.push(name);
        }
        if open.is_empty() {
            return Ok(whole.end());
        }
    }
    Err("unterminated element".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>com.apple.developer.siri</key>
	<true/>
	<key>com.apple.security.application-groups</key>
	<array>
		<string>group.a</string>
		<string>group.b&amp;c</string>
	</array>
	<key>com.apple.developer.icloud-services</key>
	<array>
		<string>CloudKit</string>
	</array>
</dict>
</plist>
"#;

    #[test]
    fn reads_groups_under_key() {
        let doc = parse_capability(DOC).unwrap();
        assert_eq!(doc.groups(), ["group.a", "group.b&c"]);
    }

    #[test]
    fn other_entries_survive_a_rewrite() {
        let mut doc = parse_capability(DOC).unwrap();
        doc.merge(["group.d"]);
        let text = doc.render();
        assert_eq!(
            text,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n\
<plist version=\"1.0\">\n\
<dict>\n\
\t<key>com.apple.developer.siri</key>\n\
\t<true/>\n\
\t<key>com.apple.security.application-groups</key>\n\
\t<array>\n\
\t\t<string>group.a</string>\n\
\t\t<string>group.b&amp;c</string>\n\
\t\t<string>group.d</string>\n\
\t</array>\n\
\t<key>com.apple.developer.icloud-services</key>\n\
\t<array>\n\
\t\t<string>CloudKit</string>\n\
\t</array>\n\
</dict>\n\
</plist>\n"
        );
        assert_eq!(parse_capability(&text).unwrap(), doc);
    }

    #[test]
    fn absent_key_is_empty_and_appended() {
        let doc = parse_with_key(DOC, "com.apple.developer.icloud-container-identifiers").unwrap();
        assert!(doc.groups().is_empty());
        let text = doc.render();
        let own = text.find("icloud-container-identifiers").unwrap();
        assert!(own > text.find("icloud-services").unwrap());
        assert!(text.contains("<key>com.apple.security.application-groups</key>"));
    }

    #[test]
    fn empty_array_element() {
        let doc = parse_capability(
            "<plist version=\"1.0\"><dict><key>com.apple.security.application-groups</key><array/></dict></plist>",
        )
        .unwrap();
        assert!(doc.groups().is_empty());
    }

    #[test]
    fn empty_root_dict() {
        let doc = parse_capability("<plist version=\"1.0\">\n<dict/>\n</plist>\n").unwrap();
        assert!(doc.groups().is_empty());
    }

    #[test]
    fn rejects_non_plist() {
        assert!(matches!(
            parse_capability("{ not xml }"),
            Err(ParseError::MalformedCapability(_))
        ));
    }

    #[test]
    fn rejects_shapes_it_cannot_reproduce() {
        let wrap = |body: &str| format!("<plist version=\"1.0\">\n<dict>\n{body}\n</dict>\n</plist>\n");
        let cases = [
            "\t<!-- shared -->\n\t<key>com.apple.security.application-groups</key>\n\t<array/>",
            "\t<key>com.apple.security.application-groups</key>\n\t<array><string><![CDATA[group.a]]></string></array>",
            "\t<key>com.apple.security.application-groups</key>\n\t<string>group.a</string>",
            "\t<key>com.apple.security.application-groups</key>\n\t<array><dict/></array>",
            "\t<key>com.apple.security.application-groups</key>\n\t<array/>\n\t<key>com.apple.security.application-groups</key>\n\t<array/>",
            "\t<key>a</key>\n\t<array><string>x</string>",
            "\t<key>a</key>\n\t<widget/>",
            "\t<true/>",
        ];
        for body in cases {
            assert!(
                matches!(parse_capability(&wrap(body)), Err(ParseError::MalformedCapability(_))),
                "accepted: {body}"
            );
        }
    }
}
