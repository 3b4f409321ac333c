//! Artefact graph model
//!
//! The lineage engine stores everything as two kinds of records:
//!
//! ```text
//! ArtefactClass { type_name, schema_definition }
//!        │ 1
//!        │
//!        ▼ N
//! Artefact { id, type, data } ──parent──< Relationship { type, creation_time } >──child── Artefact
//! ```
//!
//! Parents are inputs (formula → batch, use case → checkpoint,
//! batch → checkpoint), children are outputs. Typed domain objects are
//! rebuilt from these records by walking incident edges; see
//! [`extract_singleton_parent`] for the rule every typed reload relies on.

mod artefact;
mod class;
mod entity;
mod lineage;
mod memory;
mod relationship;
mod store;

pub use artefact::Artefact;
pub use class::{ArtefactClass, Registration};
pub use entity::Entity;
pub use lineage::LineageGraph;
pub use memory::MemoryGraphStore;
pub use relationship::{
    child_relationships, extract_singleton_parent, latest_child, optional_parent, Relationship,
};
pub use store::{GraphStore, QueryFilters};

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned artefact identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtefactId(pub u64);

impl fmt::Display for ArtefactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Store-assigned relationship identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipId(pub u64);

/// A persisted directed edge between two artefacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    /// Store-assigned id
    pub id: RelationshipId,
    /// Edge type (`batch_formula`, `checkpoint_use_case`, ...)
    pub relationship_type: String,
    /// Input side of the edge
    pub parent: ArtefactId,
    /// Output side of the edge
    pub child: ArtefactId,
    /// Store-assigned, strictly increasing per store
    pub creation_time: DateTime<Utc>,
}

/// A persisted artefact with its incident edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtefactRecord {
    /// Store-assigned id
    pub id: ArtefactId,
    /// Name of the artefact's [`ArtefactClass`]
    pub type_name: String,
    /// JSON payload, valid against the class schema
    pub data: serde_json::Value,
    /// Edges where this artefact is the child
    pub parents: Vec<RelationshipRecord>,
    /// Edges where this artefact is the parent
    pub children: Vec<RelationshipRecord>,
}

impl ArtefactRecord {
    /// All incident edges, parents first.
    pub fn incident(&self) -> impl Iterator<Item = &RelationshipRecord> {
        self.parents.iter().chain(&self.children)
    }

    /// Resolve the single parent linked through `relationship_type`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Loading`] when zero or several such edges exist.
    pub fn singleton_parent(&self, relationship_type: &str) -> crate::Result<ArtefactId> {
        extract_singleton_parent(&self.parents, self.id, relationship_type)
    }

    /// Payload field accessor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] when the field is missing.
    pub fn field(&self, name: &str) -> crate::Result<&serde_json::Value> {
        self.data.get(name).ok_or_else(|| {
            crate::Error::Serialization(format!(
                "artefact {} of type <{}> has no field <{name}>",
                self.id, self.type_name
            ))
        })
    }

    /// Check the record has the expected type.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Loading`] on a type mismatch.
    pub fn expect_type(&self, type_name: &str) -> crate::Result<()> {
        if self.type_name != type_name {
            return Err(crate::Error::Loading(format!(
                "artefact {} is of type <{}>, expected <{type_name}>",
                self.id, self.type_name
            )));
        }
        Ok(())
    }
}
