//! ML use cases

use serde::Deserialize;
use serde_json::{json, Value};

use crate::graph::{ArtefactClass, ArtefactId, ArtefactRecord, Entity, Relationship};
use crate::{Error, Result};

/// Artefact type of use cases.
pub const USE_CASE_TYPE_NAME: &str = "ml_use_case";

#[derive(Deserialize)]
struct UseCasePayload {
    use_case_name: String,
    use_case_description: String,
}

/// A business problem models are trained for; the root of checkpoint
/// lineage. Names are unique in a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MlUseCase {
    id: Option<ArtefactId>,
    name: String,
    description: String,
}

impl MlUseCase {
    /// Create an unsaved use case.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
        }
    }

    /// Store id, `None` until saved.
    #[must_use]
    pub const fn id(&self) -> Option<ArtefactId> {
        self.id
    }

    /// Use case name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free text description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Rebuild a saved use case from its record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Loading`] for a record of another type and
    /// [`Error::Serialization`] for a malformed payload.
    pub fn from_record(record: &ArtefactRecord) -> Result<Self> {
        record.expect_type(USE_CASE_TYPE_NAME)?;
        let payload = UseCasePayload::deserialize(&record.data).map_err(|e| {
            Error::Serialization(format!("malformed <{USE_CASE_TYPE_NAME}> payload: {e}"))
        })?;
        Ok(Self {
            id: Some(record.id),
            name: payload.use_case_name,
            description: payload.use_case_description,
        })
    }
}

/// Type descriptor of use case artefacts.
#[must_use]
pub fn use_case_class() -> ArtefactClass {
    ArtefactClass::new(
        USE_CASE_TYPE_NAME,
        json!({
            "type": "object",
            "properties": {
                "use_case_name": {"type": "string", "description": "name of the use case"},
                "use_case_description": {"type": "string", "description": "description of the use case"}
            },
            "required": ["use_case_name", "use_case_description"]
        }),
    )
}

impl Entity for MlUseCase {
    fn artefact_class() -> ArtefactClass {
        use_case_class()
    }

    fn artefact_id(&self) -> Option<ArtefactId> {
        self.id
    }

    fn assign_id(&mut self, id: ArtefactId) {
        self.id = Some(id);
    }

    fn to_artefact_json(&self) -> Result<Value> {
        Ok(json!({
            "use_case_name": self.name,
            "use_case_description": self.description,
        }))
    }

    fn relationships(&self) -> Vec<Relationship> {
        Vec::new()
    }
}
