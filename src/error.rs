//! Error types for the datatable adapter
//!
//! Configuration problems (bad column declarations, unknown resolver names)
//! surface as errors at request entry. Missing attributes during default
//! column resolution are absorbed by the resolver and never reach callers.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, DatatableError>;

/// Main error type for the datatable pipeline
#[derive(Error, Debug)]
pub enum DatatableError {
    #[error("Column definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Attribute error: {0}")]
    Attribute(#[from] AttributeError),

    #[error("View has no resolver method named '{name}'")]
    UnknownResolver { name: String },

    #[error("No column at index {index} ({count} declared)")]
    UnknownColumn { index: usize, count: usize },

    #[error("Structure template error: {0}")]
    Template(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Record collection error: {message}")]
    Query { message: String },
}

/// Raw column declarations that cannot be normalized
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Invalid field definition format: expected 1, 2 or 3 elements, found {len}")]
    InvalidDefinition { len: usize },

    #[error("Invalid field definition format: element {position} must be {expected}")]
    UnexpectedPart {
        position: usize,
        expected: &'static str,
    },

    #[error("Invalid field definition format: a display name or at least one field is required")]
    Empty,
}

/// Failures raised by row sources while looking up or invoking attributes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    #[error("'{name}' is not an attribute of this object")]
    Missing { name: String },

    #[error("Related object '{name}' does not exist")]
    RelatedObjectMissing { name: String },

    #[error("Calling '{name}' failed: {message}")]
    Call { name: String, message: String },
}

impl AttributeError {
    /// Missing attributes and missing related objects resolve to an empty
    /// value during chain traversal instead of failing the request.
    pub fn is_absorbable(&self) -> bool {
        matches!(self, Self::Missing { .. } | Self::RelatedObjectMissing { .. })
    }
}

impl From<handlebars::RenderError> for DatatableError {
    fn from(error: handlebars::RenderError) -> Self {
        DatatableError::Template(error.to_string())
    }
}

impl From<handlebars::TemplateError> for DatatableError {
    fn from(error: handlebars::TemplateError) -> Self {
        DatatableError::Template(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorbable_attribute_errors() {
        assert!(AttributeError::Missing { name: "a".into() }.is_absorbable());
        assert!(AttributeError::RelatedObjectMissing { name: "b".into() }.is_absorbable());
        assert!(!AttributeError::Call {
            name: "c".into(),
            message: "boom".into()
        }
        .is_absorbable());
    }

    #[test]
    fn test_definition_error_message() {
        let err = DatatableError::from(DefinitionError::InvalidDefinition { len: 4 });
        assert_eq!(
            err.to_string(),
            "Column definition error: Invalid field definition format: expected 1, 2 or 3 elements, found 4"
        );
    }
}
