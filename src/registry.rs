//! Registry of artefact types and model serializers
//!
//! One `Registry` is owned by each [`crate::LineageStore`]; nothing here is
//! global. Serializer lookup walks declared supertypes breadth first and the
//! nearest registered ancestor wins:
//!
//! ```text
//! lookup("ridge")      ridge ──▶ linear ──▶ model
//!                        0         1          2      (depth)
//! ```
//!
//! Two registered ancestors at the same depth make the lookup ambiguous.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::graph::{ArtefactClass, GraphStore, Registration};
use crate::models::ModelSerializer;
use crate::{Error, Result};

/// Artefact types known to be registered, plus model serializers.
#[derive(Default)]
pub struct Registry {
    classes: DashMap<String, ArtefactClass>,
    serializers: FxHashMap<String, Arc<dyn ModelSerializer>>,
    supertypes: FxHashMap<String, Vec<String>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the direct supertypes of a model type.
    ///
    /// Declaration order does not influence lookup; only depth does.
    pub fn declare_type<I, T>(&mut self, model_type: impl Into<String>, supertypes: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let entry = self.supertypes.entry(model_type.into()).or_default();
        for supertype in supertypes {
            let supertype = supertype.into();
            if !entry.contains(&supertype) {
                entry.push(supertype);
            }
        }
        self
    }

    /// Register a serializer for a model type, returning the one it replaces.
    pub fn register_serializer(
        &mut self,
        model_type: impl Into<String>,
        serializer: Arc<dyn ModelSerializer>,
    ) -> Option<Arc<dyn ModelSerializer>> {
        self.serializers.insert(model_type.into(), serializer)
    }

    /// Number of registered serializers.
    #[must_use]
    pub fn serializer_count(&self) -> usize {
        self.serializers.len()
    }

    /// Serializer for `model_type` or its nearest registered ancestor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] when no ancestor has a serializer or
    /// when several ancestors at the same depth do.
    pub fn serializer_for(&self, model_type: &str) -> Result<Arc<dyn ModelSerializer>> {
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut level: VecDeque<&str> = VecDeque::from([model_type]);
        visited.insert(model_type);
        while !level.is_empty() {
            let hits: Vec<&str> = level
                .iter()
                .copied()
                .filter(|t| self.serializers.contains_key(*t))
                .collect();
            match hits.as_slice() {
                [found] => {
                    debug!(model_type, serializer_type = found, "resolved model serializer");
                    return self
                        .serializers
                        .get(*found)
                        .cloned()
                        .ok_or_else(|| Error::serialization("serializer vanished during lookup"));
                }
                [] => {}
                several => {
                    return Err(Error::Serialization(format!(
                        "ambiguous serializer for model type <{model_type}>: {} are equally near",
                        several.join(", ")
                    )))
                }
            }
            let mut next = VecDeque::new();
            for current in level {
                for supertype in self.supertypes.get(current).into_iter().flatten() {
                    if visited.insert(supertype.as_str()) {
                        next.push_back(supertype.as_str());
                    }
                }
            }
            level = next;
        }
        Err(Error::Serialization(format!(
            "no serializer registered for model type <{model_type}> or any of its supertypes"
        )))
    }

    /// Make sure `class` is registered in `store`, hitting the store at most
    /// once per type name for the lifetime of the registry.
    ///
    /// # Errors
    ///
    /// Propagates [`ArtefactClass::save_if_needed`] errors.
    pub fn ensure_class<S: GraphStore + ?Sized>(
        &self,
        store: &S,
        class: &ArtefactClass,
        strict: bool,
    ) -> Result<Registration> {
        if let Some(known) = self.classes.get(&class.type_name) {
            if !strict || known.schema_definition == class.schema_definition {
                return Ok(Registration::AlreadyRegistered);
            }
        }
        let registration = class.save_if_needed(store, strict)?;
        self.classes.insert(class.type_name.clone(), class.clone());
        Ok(registration)
    }

    /// Whether `type_name` was registered through this registry.
    #[must_use]
    pub fn is_class_known(&self, type_name: &str) -> bool {
        self.classes.contains_key(type_name)
    }
}
