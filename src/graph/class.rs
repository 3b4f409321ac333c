//! Artefact classes and their registration

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::GraphStore;
use crate::schema::JsonSchema;
use crate::{Error, Result};

/// A named JSON-schema contract that artefacts of a type must satisfy.
///
/// Each entity type exposes its class through an ordinary constructor
/// function; classes are registered lazily the first time an artefact of the
/// type is saved and are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtefactClass {
    /// Unique type name
    pub type_name: String,
    /// JSON schema of the payload
    pub schema_definition: serde_json::Value,
}

/// Outcome of [`ArtefactClass::save_if_needed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The class did not exist and was created
    Created,
    /// The class already existed with a matching schema
    AlreadyRegistered,
}

impl ArtefactClass {
    /// Create a class descriptor.
    #[must_use]
    pub fn new(type_name: impl Into<String>, schema_definition: serde_json::Value) -> Self {
        Self {
            type_name: type_name.into(),
            schema_definition,
        }
    }

    /// Parse the schema definition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the definition is not a usable schema.
    pub fn schema(&self) -> Result<JsonSchema> {
        JsonSchema::new(self.schema_definition.clone())
    }

    /// Validate a payload against this class.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaValidation`] naming this type and the offending
    /// path.
    pub fn validate(&self, data: &serde_json::Value) -> Result<()> {
        self.schema()?
            .validate(data)
            .map_err(|violation| violation.into_error(&self.type_name))
    }

    /// Register this class unless the store already knows it.
    ///
    /// Fetches the class by name and creates it when absent. When present and
    /// `strict` is set, the remote schema must equal the local one; the remote
    /// schema is never swapped in silently.
    ///
    /// This is a check-then-create sequence over two store calls with no
    /// lock: two first writers racing on the same type name may both try to
    /// create it, in which case the loser gets [`Error::Conflict`] from the
    /// store and is re-checked against the winner.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaConflict`] on a strict mismatch and propagates
    /// store failures.
    pub fn save_if_needed<S: GraphStore + ?Sized>(
        &self,
        store: &S,
        strict: bool,
    ) -> Result<Registration> {
        if let Some(remote) = store.get_artefact_class(&self.type_name)? {
            debug!(type_name = %self.type_name, "artefact class already registered");
            self.check_against(&remote, strict)?;
            return Ok(Registration::AlreadyRegistered);
        }
        match store.create_artefact_class(self) {
            Ok(_) => {
                info!(type_name = %self.type_name, "registered artefact class");
                Ok(Registration::Created)
            }
            Err(Error::Conflict(_)) => {
                let remote = store.get_artefact_class(&self.type_name)?.ok_or_else(|| {
                    Error::Store(format!(
                        "class <{}> reported as existing but cannot be fetched",
                        self.type_name
                    ))
                })?;
                self.check_against(&remote, strict)?;
                Ok(Registration::AlreadyRegistered)
            }
            Err(err) => Err(err),
        }
    }

    fn check_against(&self, remote: &Self, strict: bool) -> Result<()> {
        if strict && remote.schema_definition != self.schema_definition {
            return Err(Error::SchemaConflict {
                type_name: self.type_name.clone(),
                reason: "remote schema definition differs from the local one".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraphStore;
    use serde_json::json;

    #[test]
    fn test_first_save_creates_then_noops() {
        let store = MemoryGraphStore::new();
        let class = ArtefactClass::new("thing", json!({"type": "object"}));
        assert_eq!(class.save_if_needed(&store, true).unwrap(), Registration::Created);
        assert_eq!(
            class.save_if_needed(&store, true).unwrap(),
            Registration::AlreadyRegistered
        );
        assert_eq!(store.class_count(), 1);
    }

    #[test]
    fn test_conflicting_schema_surfaces() {
        let store = MemoryGraphStore::new();
        ArtefactClass::new("thing", json!({"type": "object"}))
            .save_if_needed(&store, true)
            .unwrap();
        let changed = ArtefactClass::new("thing", json!({"type": "object", "required": ["a"]}));
        assert!(matches!(
            changed.save_if_needed(&store, true),
            Err(Error::SchemaConflict { .. })
        ));
        // non-strict registration tolerates the mismatch but keeps the remote schema
        assert_eq!(
            changed.save_if_needed(&store, false).unwrap(),
            Registration::AlreadyRegistered
        );
        assert_eq!(
            store.get_artefact_class("thing").unwrap().unwrap().schema_definition,
            json!({"type": "object"})
        );
    }

    #[test]
    fn test_validate_names_type() {
        let class = ArtefactClass::new("thing", json!({"type": "object", "required": ["a"]}));
        match class.validate(&json!({})) {
            Err(Error::SchemaValidation { type_name, .. }) => assert_eq!(type_name, "thing"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
