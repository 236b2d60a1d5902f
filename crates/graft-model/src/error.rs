//! Error types for the object model

use crate::id::ObjectId;

/// Errors raised while decoding or manipulating the object table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Identifier token is empty or malformed
    #[error("invalid object identifier: '{0}'")]
    InvalidId(String),

    /// Required field absent for a known isa
    #[error("{isa} is missing required field '{key}'")]
    MissingField {
        /// Object class
        isa: String,
        /// Field name
        key: String,
    },

    /// Field present with the wrong value shape
    #[error("{isa}.{key}: expected {expected}, found {found}")]
    UnexpectedValue {
        /// Object class
        isa: String,
        /// Field name
        key: String,
        /// Expected shape
        expected: &'static str,
        /// Actual shape
        found: &'static str,
    },

    /// Same identifier inserted twice
    #[error("duplicate object identifier: {0}")]
    DuplicateId(ObjectId),

    /// Root object absent or not a project
    #[error("root object {0} is not a PBXProject")]
    InvalidRoot(ObjectId),

    /// Referenced object absent or of another kind
    #[error("object {id} is not a {expected}")]
    WrongKind {
        /// Object looked up
        id: ObjectId,
        /// Kind the caller needed
        expected: &'static str,
    },
}

impl ModelError {
    /// Create missing field error
    pub fn missing(isa: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingField {
            isa: isa.into(),
            key: key.into(),
        }
    }

    /// Create wrong kind error
    pub fn wrong_kind(id: &ObjectId, expected: &'static str) -> Self {
        Self::WrongKind {
            id: id.clone(),
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_display() {
        let err = ModelError::missing("PBXGroup", "children");
        assert_eq!(err.to_string(), "PBXGroup is missing required field 'children'");
    }

    #[test]
    fn wrong_kind_display() {
        let id = ObjectId::new("ABC").unwrap();
        let err = ModelError::wrong_kind(&id, "PBXNativeTarget");
        assert_eq!(err.to_string(), "object ABC is not a PBXNativeTarget");
    }
}
