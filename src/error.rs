//! Error types for Trueno-Lineage
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

use crate::graph::ArtefactId;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trueno-Lineage error types
///
/// None of these are retried by the engine. A failed save leaves the entity
/// unsaved so the caller can fix the cause and call `save` again.
#[derive(Error, Debug)]
pub enum Error {
    /// Artefact payload does not satisfy its type's JSON schema
    #[error("artefact of type <{type_name}> failed schema validation at {path}: {reason}")]
    SchemaValidation {
        /// Artefact type whose schema was violated
        type_name: String,
        /// JSON pointer to the offending value (`/` for the root)
        path: String,
        /// What the schema expected
        reason: String,
    },

    /// Type registration collides with an incompatible remote schema
    #[error("artefact type <{type_name}> is already registered with a different schema: {reason}\nRegister the new schema under a new type name")]
    SchemaConflict {
        /// Conflicting type name
        type_name: String,
        /// Description of the mismatch
        reason: String,
    },

    /// Missing or ambiguous singleton relationship, or corrupt lineage
    #[error("loading error: {0}")]
    Loading(String),

    /// Output catalog regression on a major/minor checkpoint update
    #[error("catalog incompatibility: {0}")]
    CatalogIncompatibility(String),

    /// Relationship built from an artefact that has no id yet
    #[error("unsaved reference: {0}\nSave the parent artefact before linking to it")]
    UnsavedReference(String),

    /// Malformed version string
    #[error("invalid version string: {0}\nExpected <major>.<minor>.<patch> with non-negative integers")]
    VersionFormat(String),

    /// Malformed artefact JSON for a known type, or serializer failure
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Feature or catalog definition is invalid
    #[error("validation error: {0}")]
    Validation(String),

    /// Artefact already persisted; saved lineage nodes are append-only
    #[error("artefact {0} is already saved, create a new entity instead of saving twice")]
    AlreadySaved(ArtefactId),

    /// Store-side unique constraint violation
    #[error("store conflict: {0}")]
    Conflict(String),

    /// Failure reported by the graph store collaborator
    #[error("store error: {0}")]
    Store(String),

    /// IO error (model byte storage)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::Loading`] error.
    pub fn loading(msg: impl Into<String>) -> Self {
        Self::Loading(msg.into())
    }

    /// Shorthand for a [`Error::Serialization`] error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Shorthand for a [`Error::Validation`] error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_validation_message_names_type_and_path() {
        let err = Error::SchemaValidation {
            type_name: "dataset_batch".to_string(),
            path: "/batch_epoch".to_string(),
            reason: "expected number".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("dataset_batch"));
        assert!(msg.contains("/batch_epoch"));
    }

    #[test]
    fn test_serde_json_errors_map_to_serialization() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
