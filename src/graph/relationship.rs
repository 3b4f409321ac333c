//! Relationship declarations and singleton extraction

use tracing::info;

use super::{ArtefactId, GraphStore, RelationshipId, RelationshipRecord};
use crate::{Error, Result};

/// A relationship an entity declares towards one of its parents.
///
/// Endpoints are optional because the declaring entity or its parent may not
/// be saved yet; persisting the edge requires both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    relationship_type: String,
    parent: Option<ArtefactId>,
    child: Option<ArtefactId>,
}

impl Relationship {
    /// Declare an edge `parent -> child` of `relationship_type`.
    #[must_use]
    pub fn new(
        relationship_type: impl Into<String>,
        parent: Option<ArtefactId>,
        child: Option<ArtefactId>,
    ) -> Self {
        Self {
            relationship_type: relationship_type.into(),
            parent,
            child,
        }
    }

    /// Edge type.
    #[must_use]
    pub fn relationship_type(&self) -> &str {
        &self.relationship_type
    }

    /// Parent id, if the parent is saved.
    #[must_use]
    pub const fn parent(&self) -> Option<ArtefactId> {
        self.parent
    }

    /// Child id, if the child is saved.
    #[must_use]
    pub const fn child(&self) -> Option<ArtefactId> {
        self.child
    }

    /// Same declaration with the child id filled in.
    #[must_use]
    pub fn with_child(mut self, child: ArtefactId) -> Self {
        self.child = Some(child);
        self
    }

    /// Fail fast if the parent is unsaved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsavedReference`].
    pub fn ensure_parent_saved(&self) -> Result<ArtefactId> {
        self.parent.ok_or_else(|| {
            Error::UnsavedReference(format!(
                "<{}> relationship points to a parent that is not saved yet",
                self.relationship_type
            ))
        })
    }

    /// Persist the edge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsavedReference`] if either endpoint is unsaved and
    /// store errors unchanged.
    pub fn save<S: GraphStore + ?Sized>(&self, store: &S) -> Result<RelationshipId> {
        let parent = self.ensure_parent_saved()?;
        let child = self.child.ok_or_else(|| {
            Error::UnsavedReference(format!(
                "<{}> relationship has a child that is not saved yet",
                self.relationship_type
            ))
        })?;
        let id = store.create_relationship(&self.relationship_type, parent, child)?;
        info!(
            relationship_type = %self.relationship_type,
            parent = %parent,
            child = %child,
            "saved relationship"
        );
        Ok(id)
    }
}

/// Resolve the unique parent of `child` through `relationship_type`.
///
/// Filters `edges` to those of the given type pointing into `child`; exactly
/// one must remain. A missing or duplicated singleton edge means the lineage
/// is corrupt and is never resolved by picking one.
///
/// # Errors
///
/// Returns [`Error::Loading`] with "missing relationship" for zero matches
/// and "ambiguous relationship" for more than one.
pub fn extract_singleton_parent(
    edges: &[RelationshipRecord],
    child: ArtefactId,
    relationship_type: &str,
) -> Result<ArtefactId> {
    let mut parents = edges
        .iter()
        .filter(|edge| edge.child == child && edge.relationship_type == relationship_type)
        .map(|edge| edge.parent);
    match (parents.next(), parents.next()) {
        (Some(parent), None) => Ok(parent),
        (None, _) => Err(Error::Loading(format!(
            "missing relationship: artefact {child} has no <{relationship_type}> edge, backend data seems corrupt"
        ))),
        (Some(_), Some(_)) => Err(Error::Loading(format!(
            "ambiguous relationship: artefact {child} has several <{relationship_type}> edges, backend data seems corrupt"
        ))),
    }
}

/// Resolve an optional singleton parent: zero edges is `None`, one edge is
/// its parent.
///
/// # Errors
///
/// Returns [`Error::Loading`] with "ambiguous relationship" for several edges.
pub fn optional_parent(
    edges: &[RelationshipRecord],
    child: ArtefactId,
    relationship_type: &str,
) -> Result<Option<ArtefactId>> {
    let present = edges
        .iter()
        .any(|edge| edge.child == child && edge.relationship_type == relationship_type);
    if !present {
        return Ok(None);
    }
    extract_singleton_parent(edges, child, relationship_type).map(Some)
}

/// Edges of `relationship_type` leaving `parent`.
#[must_use]
pub fn child_relationships<'a>(
    edges: &'a [RelationshipRecord],
    parent: ArtefactId,
    relationship_type: &str,
) -> Vec<&'a RelationshipRecord> {
    edges
        .iter()
        .filter(|edge| edge.parent == parent && edge.relationship_type == relationship_type)
        .collect()
}

/// Most recently created edge of `relationship_type` leaving `parent`.
///
/// Ties on `creation_time` are broken by relationship id.
#[must_use]
pub fn latest_child<'a>(
    edges: &'a [RelationshipRecord],
    parent: ArtefactId,
    relationship_type: &str,
) -> Option<&'a RelationshipRecord> {
    child_relationships(edges, parent, relationship_type)
        .into_iter()
        .max_by_key(|edge| (edge.creation_time, edge.id))
}
