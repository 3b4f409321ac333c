//! Graph store contract
//!
//! The remote artefact store (HTTP service, database, ...) is an external
//! collaborator. The engine only needs these operations from it.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{ArtefactClass, ArtefactId, ArtefactRecord, RelationshipId, RelationshipRecord};
use crate::Result;

/// Equality filters on top-level payload fields.
///
/// A `BTreeMap` keeps query construction deterministic for logging.
pub type QueryFilters = BTreeMap<String, serde_json::Value>;

/// Persistence contract for artefacts and relationships.
///
/// All calls are synchronous request/response and any of them may block.
/// Retries and timeouts belong to the implementation, not to the engine.
pub trait GraphStore: Send + Sync {
    /// Register a new artefact class.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Conflict`] if the type name is already taken.
    fn create_artefact_class(&self, class: &ArtefactClass) -> Result<ArtefactClass>;

    /// Fetch a class by type name. `Ok(None)` means not found.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Store`] on store failure.
    fn get_artefact_class(&self, type_name: &str) -> Result<Option<ArtefactClass>>;

    /// Persist an artefact payload and return its new id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Store`] for an unknown type and
    /// [`crate::Error::SchemaValidation`] if the store rejects the payload.
    fn create_artefact(&self, type_name: &str, data: &serde_json::Value) -> Result<ArtefactId>;

    /// Fetch an artefact with its incident edges. `Ok(None)` means not found.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Store`] on store failure.
    fn get_artefact(&self, id: ArtefactId) -> Result<Option<ArtefactRecord>>;

    /// All artefacts of a type whose payload matches every filter.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Store`] on store failure.
    fn query_artefacts(&self, type_name: &str, filters: &QueryFilters)
        -> Result<Vec<ArtefactRecord>>;

    /// Persist a directed edge from `parent` to `child`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Store`] if either endpoint does not exist.
    fn create_relationship(
        &self,
        relationship_type: &str,
        parent: ArtefactId,
        child: ArtefactId,
    ) -> Result<RelationshipId>;

    /// All edges where `id` is the parent or the child.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Store`] on store failure.
    fn get_incident_relationships(&self, id: ArtefactId) -> Result<Vec<RelationshipRecord>>;

    /// Edges where `id` is the parent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Store`] on store failure.
    fn get_child_relationships(&self, id: ArtefactId) -> Result<Vec<RelationshipRecord>> {
        Ok(self
            .get_incident_relationships(id)?
            .into_iter()
            .filter(|edge| edge.parent == id)
            .collect())
    }
}

impl<S: GraphStore + ?Sized> GraphStore for Arc<S> {
    fn create_artefact_class(&self, class: &ArtefactClass) -> Result<ArtefactClass> {
        (**self).create_artefact_class(class)
    }

    fn get_artefact_class(&self, type_name: &str) -> Result<Option<ArtefactClass>> {
        (**self).get_artefact_class(type_name)
    }

    fn create_artefact(&self, type_name: &str, data: &serde_json::Value) -> Result<ArtefactId> {
        (**self).create_artefact(type_name, data)
    }

    fn get_artefact(&self, id: ArtefactId) -> Result<Option<ArtefactRecord>> {
        (**self).get_artefact(id)
    }

    fn query_artefacts(
        &self,
        type_name: &str,
        filters: &QueryFilters,
    ) -> Result<Vec<ArtefactRecord>> {
        (**self).query_artefacts(type_name, filters)
    }

    fn create_relationship(
        &self,
        relationship_type: &str,
        parent: ArtefactId,
        child: ArtefactId,
    ) -> Result<RelationshipId> {
        (**self).create_relationship(relationship_type, parent, child)
    }

    fn get_incident_relationships(&self, id: ArtefactId) -> Result<Vec<RelationshipRecord>> {
        (**self).get_incident_relationships(id)
    }

    fn get_child_relationships(&self, id: ArtefactId) -> Result<Vec<RelationshipRecord>> {
        (**self).get_child_relationships(id)
    }
}
