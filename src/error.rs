//! Error types for structured-data trees

use thiserror::Error;

/// Result type for structured-data operations
pub type Result<T> = std::result::Result<T, StructuredDataError>;

/// Structured-data errors
#[derive(Error, Debug)]
pub enum StructuredDataError {
    #[error("Malformed identifier: '{0}'")]
    MalformedIdentifier(String),

    #[error("Unknown field: '{0}' is not declared by the data definition")]
    UnknownField(String),

    #[error("Field '{0}' is not declared multiple")]
    NotMultiple(String),

    #[error("Field path '{0}' is ambiguous: it has a repeated ancestor")]
    AmbiguousFieldPath(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Duplicate identifier in payload: {0}")]
    DuplicateIdentifier(String),

    #[error("Empty value for required field {0}")]
    EmptyRequiredValue(String),

    #[error("Value '{value}' is not one of the items of {identifier}")]
    UnknownEnumValue { identifier: String, value: String },

    #[error("Invalid date value '{value}' for {identifier}")]
    InvalidDateValue { identifier: String, value: String },

    #[error("Field {0} accepts a single value only")]
    MultipleValuesNotAllowed(String),

    #[error("Cannot remove the only instance of {0}")]
    CannotRemoveOnlyInstance(String),

    #[error("Wrong asset kind for {identifier}: expected {expected}, got {actual}")]
    WrongAssetKind {
        identifier: String,
        expected: String,
        actual: String,
    },

    #[error("Node {identifier} is a {actual} node, not a {expected} node")]
    NodeKindMismatch {
        identifier: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{0} and {1} are not siblings")]
    NotSiblings(String, String),

    #[error("Invalid data definition: {0}")]
    InvalidDefinition(String),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StructuredDataError {
    /// Errors that cross-tree copy and phantom reconciliation turn into a skip.
    ///
    /// Everywhere else these are terminal.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::UnknownField(_) | Self::NotMultiple(_) | Self::NodeNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skippable_kinds() {
        assert!(StructuredDataError::UnknownField("a".into()).is_skippable());
        assert!(StructuredDataError::NodeNotFound("a;0".into()).is_skippable());
        assert!(!StructuredDataError::MalformedIdentifier("".into()).is_skippable());
        assert!(!StructuredDataError::EmptyRequiredValue("a".into()).is_skippable());
    }
}
