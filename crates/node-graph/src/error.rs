//! Error types for the node graph core

use thiserror::Error;

/// Result type alias using GraphError
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur in the node graph core
///
/// Every variant is caller-correctable. Lookups of ids that are simply absent
/// from a graph are not errors; those operations return `bool` or `Option`.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Node type is not registered
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// Node definition failed structural validation
    #[error("Invalid definition for '{node_type}': {}", .errors.join("; "))]
    InvalidDefinition {
        node_type: String,
        errors: Vec<String>,
    },

    /// Node data was rejected by the definition's validator
    #[error("Invalid data for '{node_type}': {}", .errors.join("; "))]
    DataValidation {
        node_type: String,
        errors: Vec<String>,
        warnings: Vec<String>,
    },

    /// Module is missing from a guide document
    #[error("Module '{0}' not found in guide document")]
    ModuleNotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),
}

impl GraphError {
    /// Create an invalid definition error
    pub fn invalid_definition(node_type: impl Into<String>, errors: Vec<String>) -> Self {
        Self::InvalidDefinition {
            node_type: node_type.into(),
            errors,
        }
    }

    /// Collect the human-readable diagnostics carried by this error
    pub fn diagnostics(&self) -> Vec<String> {
        match self {
            Self::InvalidDefinition { errors, .. } | Self::DataValidation { errors, .. } => {
                errors.clone()
            }
            other => vec![other.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GraphError::UnknownNodeType("Blob3D".to_string());
        assert_eq!(err.to_string(), "Unknown node type: Blob3D");

        let err = GraphError::invalid_definition(
            "Box3D",
            vec!["Duplicate input key: size".to_string(), "Node label is required".to_string()],
        );
        assert_eq!(
            err.to_string(),
            "Invalid definition for 'Box3D': Duplicate input key: size; Node label is required"
        );
    }

    #[test]
    fn test_diagnostics() {
        let err = GraphError::DataValidation {
            node_type: "Sphere3D".to_string(),
            errors: vec!["radius must be non-negative".to_string()],
            warnings: vec![],
        };
        assert_eq!(err.diagnostics(), vec!["radius must be non-negative"]);

        let err = GraphError::ModuleNotFound("base".to_string());
        assert_eq!(err.diagnostics(), vec!["Module 'base' not found in guide document"]);
    }
}
