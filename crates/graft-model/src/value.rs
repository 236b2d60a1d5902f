//! Property-list values
//!
//! The project file is an OpenStep property list: strings, arrays,
//! dictionaries and (rarely) hex data. Dictionaries keep ASCII key order,
//! which is the order Xcode writes them in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Ordered dictionary of property-list values
pub type Dict = BTreeMap<String, Value>;

/// A property-list value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Quoted or bare string
    String(String),
    /// Parenthesised array
    Array(Vec<Value>),
    /// Braced dictionary
    Dict(Dict),
    /// `<hex>` data
    Data(Vec<u8>),
}

impl Value {
    /// String payload, if this is a string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Array payload, if this is an array
    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Dictionary payload, if this is a dictionary
    #[inline]
    #[must_use]
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Self::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Dict(_) => "dictionary",
            Self::Data(_) => "data",
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::Array(value)
    }
}

impl From<Dict> for Value {
    fn from(value: Dict) -> Self {
        Self::Dict(value)
    }
}

/// A build-setting value
///
/// Most settings are single strings; a few (capability groups, search
/// paths, preprocessor definitions) are ordered lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// Scalar setting, overwritten on patch
    Text(String),
    /// List setting, set-union merged on patch
    List(Vec<String>),
}

impl SettingValue {
    /// Scalar text
    #[inline]
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// List from any string iterator
    #[must_use]
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Scalar payload
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::List(_) => None,
        }
    }

    /// Entries viewed as a list (a scalar is a one-element list)
    #[must_use]
    pub fn entries(&self) -> Vec<&str> {
        match self {
            Self::Text(s) => vec![s.as_str()],
            Self::List(items) => items.iter().map(String::as_str).collect(),
        }
    }

    /// Union with `other`, keeping existing order and appending new entries
    #[must_use]
    pub fn union(&self, other: &[String]) -> Self {
        let mut merged: Vec<String> = self.entries().into_iter().map(str::to_string).collect();
        for item in other {
            if !merged.contains(item) {
                merged.push(item.clone());
            }
        }
        Self::List(merged)
    }

    pub(crate) fn to_value(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::List(items) => {
                Value::Array(items.iter().map(|s| Value::String(s.clone())).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_keeps_order_and_skips_duplicates() {
        let existing = SettingValue::list(["group.a"]);
        assert_eq!(
            existing.union(&["group.a".to_string()]),
            SettingValue::list(["group.a"])
        );
        assert_eq!(
            existing.union(&["group.b".to_string()]),
            SettingValue::list(["group.a", "group.b"])
        );
    }

    #[test]
    fn scalar_unions_as_single_entry() {
        let existing = SettingValue::text("$(inherited)");
        assert_eq!(
            existing.union(&["-ObjC".to_string()]),
            SettingValue::list(["$(inherited)", "-ObjC"])
        );
    }

    #[test]
    fn to_value_matches_shape() {
        assert_eq!(SettingValue::text("YES").to_value(), Value::from("YES"));
        assert_eq!(
            SettingValue::list(["a", "b"]).to_value(),
            Value::Array(vec![Value::from("a"), Value::from("b")])
        );
    }
}
