//! In-memory graph store implementation using `DashMap`.
//!
//! Reference implementation of [`GraphStore`]: data is lost on process
//! restart. It enforces the same write-side rules a remote artefact store
//! does (unique type names, schema validation, existing endpoints).

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::{
    ArtefactClass, ArtefactId, ArtefactRecord, GraphStore, QueryFilters, RelationshipId,
    RelationshipRecord,
};
use crate::schema::JsonSchema;
use crate::{Error, Result};

struct StoredClass {
    class: ArtefactClass,
    schema: JsonSchema,
}

struct StoredArtefact {
    type_name: String,
    data: serde_json::Value,
}

/// In-memory artefact graph.
///
/// Thread-safe; ids are assigned from atomic counters starting at 1.
/// Relationship `creation_time` is strictly increasing even when edges are
/// created within the same clock tick.
///
/// # Example
///
/// ```rust
/// use trueno_lineage::graph::{ArtefactClass, GraphStore, MemoryGraphStore};
///
/// let store = MemoryGraphStore::new();
/// store.create_artefact_class(&ArtefactClass::new("note", serde_json::json!({"type": "object"})))?;
/// let id = store.create_artefact("note", &serde_json::json!({"text": "hi"}))?;
/// assert!(store.get_artefact(id)?.is_some());
/// # Ok::<(), trueno_lineage::Error>(())
/// ```
pub struct MemoryGraphStore {
    classes: DashMap<String, StoredClass>,
    artefacts: DashMap<ArtefactId, StoredArtefact>,
    relationships: DashMap<RelationshipId, RelationshipRecord>,
    incident: DashMap<ArtefactId, Vec<RelationshipId>>,
    next_artefact_id: AtomicU64,
    next_relationship_id: AtomicU64,
    last_creation_micros: AtomicI64,
}

impl MemoryGraphStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            classes: DashMap::new(),
            artefacts: DashMap::new(),
            relationships: DashMap::new(),
            incident: DashMap::new(),
            next_artefact_id: AtomicU64::new(1),
            next_relationship_id: AtomicU64::new(1),
            last_creation_micros: AtomicI64::new(i64::MIN),
        }
    }

    /// Number of artefacts.
    #[must_use]
    pub fn artefact_count(&self) -> usize {
        self.artefacts.len()
    }

    /// Number of relationships.
    #[must_use]
    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Number of registered classes.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Check if the store holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.artefacts.is_empty() && self.relationships.is_empty()
    }

    fn next_creation_time(&self) -> Result<DateTime<Utc>> {
        let now = Utc::now().timestamp_micros();
        let previous = self
            .last_creation_micros
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or(now);
        let assigned = now.max(previous.saturating_add(1));
        DateTime::from_timestamp_micros(assigned)
            .ok_or_else(|| Error::Store(format!("creation time {assigned}us out of range")))
    }

    fn incident_records(&self, id: ArtefactId) -> Vec<RelationshipRecord> {
        let edge_ids = self
            .incident
            .get(&id)
            .map(|ids| ids.value().clone())
            .unwrap_or_default();
        let mut edges: Vec<RelationshipRecord> = edge_ids
            .iter()
            .filter_map(|edge_id| self.relationships.get(edge_id).map(|e| e.value().clone()))
            .collect();
        edges.sort_by_key(|edge| edge.id);
        edges
    }

    fn record(&self, id: ArtefactId, type_name: String, data: serde_json::Value) -> ArtefactRecord {
        let (parents, children): (Vec<_>, Vec<_>) = self
            .incident_records(id)
            .into_iter()
            .partition(|edge| edge.child == id);
        ArtefactRecord {
            id,
            type_name,
            data,
            parents,
            children,
        }
    }
}

impl Default for MemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore for MemoryGraphStore {
    fn create_artefact_class(&self, class: &ArtefactClass) -> Result<ArtefactClass> {
        let schema = JsonSchema::new(class.schema_definition.clone())?;
        match self.classes.entry(class.type_name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(Error::Conflict(format!(
                "artefact class <{}> already exists",
                class.type_name
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(StoredClass {
                    class: class.clone(),
                    schema,
                });
                Ok(class.clone())
            }
        }
    }

    fn get_artefact_class(&self, type_name: &str) -> Result<Option<ArtefactClass>> {
        Ok(self.classes.get(type_name).map(|c| c.class.clone()))
    }

    fn create_artefact(&self, type_name: &str, data: &serde_json::Value) -> Result<ArtefactId> {
        {
            let stored = self
                .classes
                .get(type_name)
                .ok_or_else(|| Error::Store(format!("unknown artefact class <{type_name}>")))?;
            stored
                .schema
                .validate(data)
                .map_err(|violation| violation.into_error(type_name))?;
        }
        let id = ArtefactId(self.next_artefact_id.fetch_add(1, Ordering::SeqCst));
        self.artefacts.insert(
            id,
            StoredArtefact {
                type_name: type_name.to_string(),
                data: data.clone(),
            },
        );
        Ok(id)
    }

    fn get_artefact(&self, id: ArtefactId) -> Result<Option<ArtefactRecord>> {
        let Some((type_name, data)) = self
            .artefacts
            .get(&id)
            .map(|a| (a.type_name.clone(), a.data.clone()))
        else {
            return Ok(None);
        };
        Ok(Some(self.record(id, type_name, data)))
    }

    fn query_artefacts(
        &self,
        type_name: &str,
        filters: &QueryFilters,
    ) -> Result<Vec<ArtefactRecord>> {
        let mut matches: Vec<(ArtefactId, serde_json::Value)> = self
            .artefacts
            .iter()
            .filter(|entry| entry.type_name == type_name)
            .filter(|entry| {
                filters
                    .iter()
                    .all(|(field, expected)| entry.data.get(field) == Some(expected))
            })
            .map(|entry| (*entry.key(), entry.data.clone()))
            .collect();
        matches.sort_by_key(|(id, _)| *id);
        Ok(matches
            .into_iter()
            .map(|(id, data)| self.record(id, type_name.to_string(), data))
            .collect())
    }

    fn create_relationship(
        &self,
        relationship_type: &str,
        parent: ArtefactId,
        child: ArtefactId,
    ) -> Result<RelationshipId> {
        for endpoint in [parent, child] {
            if !self.artefacts.contains_key(&endpoint) {
                return Err(Error::Store(format!(
                    "cannot link <{relationship_type}>: artefact {endpoint} does not exist"
                )));
            }
        }
        let id = RelationshipId(self.next_relationship_id.fetch_add(1, Ordering::SeqCst));
        let record = RelationshipRecord {
            id,
            relationship_type: relationship_type.to_string(),
            parent,
            child,
            creation_time: self.next_creation_time()?,
        };
        self.relationships.insert(id, record);
        self.incident.entry(parent).or_default().push(id);
        if child != parent {
            self.incident.entry(child).or_default().push(id);
        }
        Ok(id)
    }

    fn get_incident_relationships(&self, id: ArtefactId) -> Result<Vec<RelationshipRecord>> {
        Ok(self.incident_records(id))
    }
}
