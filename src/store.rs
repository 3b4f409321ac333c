//! Lineage store facade
//!
//! Owns the graph store handle, the [`Registry`], the configuration and the
//! notifier. Dataset and model operations are implemented on it in
//! [`crate::datasets`] and [`crate::models`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::LineageConfig;
use crate::events::{dispatch, LineageEvent, LineageNotifier, TracingNotifier};
use crate::graph::{
    ArtefactClass, ArtefactId, ArtefactRecord, Entity, GraphStore, QueryFilters, Registration,
    RelationshipRecord,
};
use crate::registry::Registry;
use crate::{Error, Result};

/// Entry point for saving and reloading lineage entities.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use trueno_lineage::graph::MemoryGraphStore;
/// use trueno_lineage::models::MlUseCase;
/// use trueno_lineage::LineageStore;
///
/// let store = LineageStore::builder(Arc::new(MemoryGraphStore::new())).build();
/// let mut use_case = MlUseCase::new("churn", "predict churn");
/// let id = store.save_use_case(&mut use_case)?;
/// assert_eq!(store.get_use_case("churn")?.and_then(|u| u.id()), Some(id));
/// # Ok::<(), trueno_lineage::Error>(())
/// ```
pub struct LineageStore {
    store: Arc<dyn GraphStore>,
    registry: Registry,
    config: LineageConfig,
    notifier: Arc<dyn LineageNotifier>,
}

impl LineageStore {
    /// Start building a facade over `store`.
    #[must_use]
    pub fn builder(store: Arc<dyn GraphStore>) -> LineageStoreBuilder {
        LineageStoreBuilder::new(store)
    }

    /// Facade with default configuration, registry and notifier.
    #[must_use]
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self::builder(store).build()
    }

    /// Underlying graph store.
    #[must_use]
    pub fn graph(&self) -> &dyn GraphStore {
        self.store.as_ref()
    }

    /// Artefact type and serializer registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &LineageConfig {
        &self.config
    }

    /// Register `class` unless already done.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaConflict`] on a strict schema mismatch and
    /// store errors unchanged.
    pub fn ensure_class(&self, class: &ArtefactClass) -> Result<Registration> {
        let registration =
            self.registry
                .ensure_class(self.store.as_ref(), class, self.config.strict_schema_checks)?;
        if registration == Registration::Created {
            self.emit(&LineageEvent::ArtefactClassCreated {
                type_name: class.type_name.clone(),
            });
        }
        Ok(registration)
    }

    /// Persist an unsaved entity and the edges to its parents.
    ///
    /// Every declared parent must already be saved; this is checked before
    /// anything is written. The id is assigned only once the artefact and all
    /// its edges are persisted, so on error the entity stays unsaved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadySaved`], [`Error::UnsavedReference`],
    /// [`Error::SchemaValidation`] or store errors.
    pub fn save<E: Entity>(&self, entity: &mut E) -> Result<ArtefactId> {
        if let Some(id) = entity.artefact_id() {
            return Err(Error::AlreadySaved(id));
        }
        let relationships = entity.relationships();
        for relationship in &relationships {
            relationship.ensure_parent_saved()?;
        }
        let mut artefact = entity.to_artefact()?;
        self.ensure_class(artefact.class())?;
        let type_name = artefact.class().type_name.clone();

        let id = match artefact.save(self.store.as_ref()) {
            Ok(id) => id,
            Err(err) => {
                self.emit(&LineageEvent::ArtefactCreationFailed {
                    type_name,
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };
        self.emit(&LineageEvent::ArtefactCreated {
            type_name: type_name.clone(),
            artefact_id: id,
        });

        for relationship in relationships {
            let relationship = relationship.with_child(id);
            match relationship.save(self.store.as_ref()) {
                Ok(relationship_id) => self.emit(&LineageEvent::RelationshipCreated {
                    relationship_id,
                    relationship_type: relationship.relationship_type().to_string(),
                    parent: relationship.parent().unwrap_or(id),
                    child: id,
                }),
                Err(err) => {
                    warn!(
                        type_name = %type_name,
                        artefact_id = %id,
                        relationship_type = relationship.relationship_type(),
                        error = %err,
                        "artefact persisted but its lineage edge failed, entity left unsaved"
                    );
                    return Err(err);
                }
            }
        }
        entity.assign_id(id);
        info!(type_name = %type_name, artefact_id = %id, "saved entity");
        Ok(id)
    }

    /// Fetch a record, failing if absent.
    pub(crate) fn fetch(&self, id: ArtefactId) -> Result<ArtefactRecord> {
        debug!(artefact_id = %id, "fetching artefact");
        self.store
            .get_artefact(id)?
            .ok_or_else(|| Error::Loading(format!("artefact {id} not found in the store")))
    }

    /// Fetch a record and check its type.
    pub(crate) fn fetch_typed(&self, id: ArtefactId, type_name: &str) -> Result<ArtefactRecord> {
        let record = self.fetch(id)?;
        record.expect_type(type_name)?;
        Ok(record)
    }

    pub(crate) fn query(&self, type_name: &str, filters: &QueryFilters) -> Result<Vec<ArtefactRecord>> {
        debug!(type_name, ?filters, "querying artefacts");
        self.store.query_artefacts(type_name, filters)
    }

    /// Child edges of `parent` of the given type; `parent` must be saved.
    pub(crate) fn child_edges(
        &self,
        parent: Option<ArtefactId>,
        relationship_type: &str,
        what: &str,
    ) -> Result<Vec<RelationshipRecord>> {
        let parent = parent.ok_or_else(|| {
            Error::Loading(format!("cannot load the {what} of an entity that is not saved yet"))
        })?;
        debug!(artefact_id = %parent, relationship_type, "fetching child relationships");
        Ok(self
            .store
            .get_child_relationships(parent)?
            .into_iter()
            .filter(|edge| edge.relationship_type == relationship_type)
            .collect())
    }

    pub(crate) fn emit(&self, event: &LineageEvent) {
        dispatch(self.notifier.as_ref(), event);
    }
}

/// Builder for [`LineageStore`].
pub struct LineageStoreBuilder {
    store: Arc<dyn GraphStore>,
    registry: Registry,
    config: LineageConfig,
    notifier: Arc<dyn LineageNotifier>,
}

impl LineageStoreBuilder {
    /// Builder over `store` with defaults.
    #[must_use]
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            registry: Registry::new(),
            config: LineageConfig::default(),
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// Use a configuration.
    #[must_use]
    pub fn config(mut self, config: LineageConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a pre-populated registry (serializers, type declarations).
    #[must_use]
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Deliver lineage events to `notifier`.
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn LineageNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Build the facade.
    #[must_use]
    pub fn build(self) -> LineageStore {
        LineageStore {
            store: self.store,
            registry: self.registry,
            config: self.config,
            notifier: self.notifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{MemoryGraphStore, Relationship};
    use serde_json::{json, Value};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<&'static str>>);

    impl LineageNotifier for Recorder {
        fn notify(&self, event: &LineageEvent) -> Result<()> {
            self.0.lock().unwrap().push(event.name());
            Ok(())
        }
    }

    struct Note {
        id: Option<ArtefactId>,
        text: Value,
        parent: Option<ArtefactId>,
    }

    impl Entity for Note {
        fn artefact_class() -> ArtefactClass {
            ArtefactClass::new(
                "note",
                json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]}),
            )
        }

        fn artefact_id(&self) -> Option<ArtefactId> {
            self.id
        }

        fn assign_id(&mut self, id: ArtefactId) {
            self.id = Some(id);
        }

        fn to_artefact_json(&self) -> Result<Value> {
            Ok(json!({"text": self.text}))
        }

        fn relationships(&self) -> Vec<Relationship> {
            self.parent
                .map(|p| vec![Relationship::new("note_parent", Some(p), None)])
                .unwrap_or_default()
        }
    }

    fn note(text: Value, parent: Option<ArtefactId>) -> Note {
        Note { id: None, text, parent }
    }

    fn facade() -> (Arc<MemoryGraphStore>, Arc<Recorder>, LineageStore) {
        let graph = Arc::new(MemoryGraphStore::new());
        let recorder = Arc::new(Recorder::default());
        let store = LineageStore::builder(graph.clone())
            .notifier(recorder.clone())
            .build();
        (graph, recorder, store)
    }

    #[test]
    fn test_save_registers_class_and_emits() {
        let (graph, recorder, store) = facade();
        let mut first = note(json!("a"), None);
        let parent = store.save(&mut first).unwrap();
        let mut second = note(json!("b"), Some(parent));
        store.save(&mut second).unwrap();

        assert_eq!(graph.class_count(), 1);
        assert_eq!(graph.relationship_count(), 1);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![
                "artefact_class_created",
                "artefact_created",
                "artefact_created",
                "relationship_created"
            ]
        );
    }

    #[test]
    fn test_notifier_failure_does_not_undo_save() {
        struct Failing(Mutex<usize>);

        impl LineageNotifier for Failing {
            fn notify(&self, _event: &LineageEvent) -> Result<()> {
                *self.0.lock().unwrap() += 1;
                Err(Error::Store("listener unavailable".into()))
            }
        }

        let graph = Arc::new(MemoryGraphStore::new());
        let notifier = Arc::new(Failing(Mutex::new(0)));
        let store = LineageStore::builder(graph.clone())
            .notifier(notifier.clone())
            .build();

        let mut parent = note(json!("a"), None);
        let parent_id = store.save(&mut parent).unwrap();
        let mut child = note(json!("b"), Some(parent_id));
        let child_id = store.save(&mut child).unwrap();

        assert_eq!(parent.artefact_id(), Some(parent_id));
        assert_eq!(child.artefact_id(), Some(child_id));
        assert_eq!(graph.class_count(), 1);
        assert_eq!(graph.artefact_count(), 2);
        assert_eq!(graph.relationship_count(), 1);
        // class, two artefacts and the edge were all announced
        assert_eq!(*notifier.0.lock().unwrap(), 4);
        assert_eq!(store.fetch(child_id).unwrap().parents.len(), 1);
    }

    #[test]
    fn test_save_twice_fails() {
        let (_, _, store) = facade();
        let mut entity = note(json!("a"), None);
        store.save(&mut entity).unwrap();
        assert!(matches!(store.save(&mut entity), Err(Error::AlreadySaved(_))));
    }

    #[test]
    fn test_unsaved_parent_fails_before_any_write() {
        struct Dangling(Note);

        impl Entity for Dangling {
            fn artefact_class() -> ArtefactClass {
                Note::artefact_class()
            }

            fn artefact_id(&self) -> Option<ArtefactId> {
                self.0.id
            }

            fn assign_id(&mut self, id: ArtefactId) {
                self.0.id = Some(id);
            }

            fn to_artefact_json(&self) -> Result<Value> {
                self.0.to_artefact_json()
            }

            fn relationships(&self) -> Vec<Relationship> {
                vec![Relationship::new("note_parent", None, None)]
            }
        }

        let (graph, _, store) = facade();
        let mut dangling = Dangling(note(json!("d"), None));
        assert!(matches!(
            store.save(&mut dangling),
            Err(Error::UnsavedReference(_))
        ));
        assert!(dangling.artefact_id().is_none());
        assert!(graph.is_empty());
    }

    #[test]
    fn test_schema_violation_leaves_entity_unsaved() {
        let (graph, recorder, store) = facade();
        let mut bad = note(json!(42), None);
        assert!(matches!(
            store.save(&mut bad),
            Err(Error::SchemaValidation { .. })
        ));
        assert!(bad.artefact_id().is_none());
        assert_eq!(graph.artefact_count(), 0);
        assert!(recorder
            .0
            .lock()
            .unwrap()
            .contains(&"artefact_creation_failed"));
    }

    #[test]
    fn test_fetch_typed_rejects_other_type() {
        let (_, _, store) = facade();
        let mut entity = note(json!("a"), None);
        let id = store.save(&mut entity).unwrap();
        assert!(store.fetch_typed(id, "note").is_ok());
        assert!(matches!(
            store.fetch_typed(id, "ml_use_case"),
            Err(Error::Loading(_))
        ));
        assert!(matches!(store.fetch(ArtefactId(99)), Err(Error::Loading(_))));
    }
}
