//! Generic artefacts: a schema-validated JSON record of a given class

use tracing::info;

use super::{ArtefactClass, ArtefactId, ArtefactRecord, GraphStore};
use crate::{Error, Result};

/// A JSON payload of a given [`ArtefactClass`], the atomic unit of
/// persisted state.
///
/// An artefact without an id is unsaved. Saving validates the payload first
/// and only assigns the id once the store accepted it, so a failed save
/// leaves the artefact unsaved and retryable.
#[derive(Debug, Clone, PartialEq)]
pub struct Artefact {
    id: Option<ArtefactId>,
    class: ArtefactClass,
    data: serde_json::Value,
}

impl Artefact {
    /// Create an unsaved artefact.
    #[must_use]
    pub const fn new(class: ArtefactClass, data: serde_json::Value) -> Self {
        Self {
            id: None,
            class,
            data,
        }
    }

    /// Rebuild a saved artefact from a store record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Loading`] if the record is not of `class`.
    pub fn from_record(class: ArtefactClass, record: &ArtefactRecord) -> Result<Self> {
        record.expect_type(&class.type_name)?;
        Ok(Self {
            id: Some(record.id),
            class,
            data: record.data.clone(),
        })
    }

    /// Store id, `None` until saved.
    #[must_use]
    pub const fn id(&self) -> Option<ArtefactId> {
        self.id
    }

    /// Whether the artefact has been persisted.
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        self.id.is_some()
    }

    /// The artefact's class.
    #[must_use]
    pub const fn class(&self) -> &ArtefactClass {
        &self.class
    }

    /// The payload.
    #[must_use]
    pub const fn data(&self) -> &serde_json::Value {
        &self.data
    }

    /// Validate the payload against the class schema, client side.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaValidation`].
    pub fn validate(&self) -> Result<()> {
        self.class.validate(&self.data)
    }

    /// Validate and persist the artefact, assigning its id.
    ///
    /// The class must already be registered (see
    /// [`ArtefactClass::save_if_needed`]).
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadySaved`] for a saved artefact,
    /// [`Error::SchemaValidation`] for an invalid payload, and store errors
    /// unchanged. The id stays unset on any error.
    pub fn save<S: GraphStore + ?Sized>(&mut self, store: &S) -> Result<ArtefactId> {
        if let Some(id) = self.id {
            return Err(Error::AlreadySaved(id));
        }
        self.validate()?;
        let id = store.create_artefact(&self.class.type_name, &self.data)?;
        info!(type_name = %self.class.type_name, artefact_id = %id, "saved artefact");
        self.id = Some(id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraphStore;
    use serde_json::json;

    fn class() -> ArtefactClass {
        ArtefactClass::new(
            "sample",
            json!({"type": "object", "properties": {"n": {"type": "integer"}}, "required": ["n"]}),
        )
    }

    #[test]
    fn test_save_assigns_id_once() {
        let store = MemoryGraphStore::new();
        class().save_if_needed(&store, true).unwrap();
        let mut artefact = Artefact::new(class(), json!({"n": 1}));
        assert!(!artefact.is_saved());
        let id = artefact.save(&store).unwrap();
        assert_eq!(artefact.id(), Some(id));
        assert!(matches!(artefact.save(&store), Err(Error::AlreadySaved(_))));
        assert_eq!(store.artefact_count(), 1);
    }

    #[test]
    fn test_invalid_payload_stays_unsaved() {
        let store = MemoryGraphStore::new();
        class().save_if_needed(&store, true).unwrap();
        let mut artefact = Artefact::new(class(), json!({"m": 1}));
        assert!(matches!(
            artefact.save(&store),
            Err(Error::SchemaValidation { .. })
        ));
        assert_eq!(artefact.id(), None);
        assert_eq!(store.artefact_count(), 0);
    }

    #[test]
    fn test_store_failure_stays_unsaved() {
        // class never registered: the store rejects the write
        let store = MemoryGraphStore::new();
        let mut artefact = Artefact::new(class(), json!({"n": 1}));
        assert!(matches!(artefact.save(&store), Err(Error::Store(_))));
        assert!(!artefact.is_saved());
    }

    #[test]
    fn test_from_record_checks_type() {
        let store = MemoryGraphStore::new();
        class().save_if_needed(&store, true).unwrap();
        let id = store.create_artefact("sample", &json!({"n": 2})).unwrap();
        let record = store.get_artefact(id).unwrap().unwrap();
        let artefact = Artefact::from_record(class(), &record).unwrap();
        assert_eq!(artefact.id(), Some(id));

        let other = ArtefactClass::new("other", json!({"type": "object"}));
        assert!(matches!(
            Artefact::from_record(other, &record),
            Err(Error::Loading(_))
        ));
    }
}
