//! Typed entities backed by artefacts

use super::{Artefact, ArtefactClass, ArtefactId, Relationship};
use crate::Result;

/// A domain object persisted as one artefact plus the edges to its parents.
///
/// The artefact representation is derived on demand from the entity's
/// fields, so there is no cached copy to keep in sync. Entities start
/// unsaved; [`crate::LineageStore::save`] persists the artefact, then the
/// declared relationships, and only then assigns the id.
pub trait Entity {
    /// Type descriptor shared by every entity of this kind.
    fn artefact_class() -> ArtefactClass;

    /// Store id, `None` until saved.
    fn artefact_id(&self) -> Option<ArtefactId>;

    /// Record the id assigned by the store.
    fn assign_id(&mut self, id: ArtefactId);

    /// Serialize the domain fields into the artefact payload.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] when a field cannot be
    /// represented.
    fn to_artefact_json(&self) -> Result<serde_json::Value>;

    /// Edges from this entity's parents, with the child side left unset.
    ///
    /// Edges are written in order. The edge a parent scans its children
    /// through (e.g. use case to checkpoint) must come last, so a save that
    /// fails halfway leaves no half-linked node reachable from that parent.
    fn relationships(&self) -> Vec<Relationship>;

    /// Materialize the generic artefact, unsaved.
    ///
    /// # Errors
    ///
    /// Propagates [`Entity::to_artefact_json`] errors.
    fn to_artefact(&self) -> Result<Artefact> {
        Ok(Artefact::new(Self::artefact_class(), self.to_artefact_json()?))
    }

    /// Whether the entity has been persisted.
    fn is_saved(&self) -> bool {
        self.artefact_id().is_some()
    }
}
