//! Model checkpoints

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::MlUseCase;
use crate::catalog::DataCatalog;
use crate::datasets::GenericBatch;
use crate::graph::{optional_parent, ArtefactClass, ArtefactId, ArtefactRecord, Entity, Relationship};
use crate::{Error, Result, Version};

/// Artefact type of checkpoints.
pub const CHECKPOINT_TYPE_NAME: &str = "model_checkpoint";

/// Singleton edge from a use case to each of its checkpoints.
pub const CHECKPOINT_USE_CASE: &str = "checkpoint_use_case";

/// Singleton edge from the training batch to a checkpoint.
pub const CHECKPOINT_DATASET_BATCH: &str = "checkpoint_dataset_batch";

/// Optional edge from the checkpoint a checkpoint was derived from.
pub const CHECKPOINT_PARENT: &str = "checkpoint_parent";

#[derive(Deserialize)]
struct CheckpointPayload {
    uuid: Uuid,
    version: Version,
    model_bytes_path: PathBuf,
    model_type: String,
    input_catalog: Value,
    output_catalog: Value,
}

/// Metadata of a saved model: which use case, which data, which version.
///
/// The model bytes themselves live under the configured model root and are
/// written by [`crate::LineageStore::save_checkpoint`].
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCheckpoint {
    id: Option<ArtefactId>,
    uuid: Uuid,
    use_case: MlUseCase,
    version: Version,
    dataset_batch: GenericBatch,
    input_catalog: DataCatalog,
    output_catalog: DataCatalog,
    model_type: Option<String>,
    model_bytes_path: Option<PathBuf>,
    parent_checkpoint: Option<ArtefactId>,
}

/// Inputs of a major or minor checkpoint update.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointUpdate {
    /// Batch the new model is trained on
    pub dataset_batch: GenericBatch,
    /// Catalog the new model consumes
    pub input_catalog: DataCatalog,
    /// Catalog the new model produces
    pub output_catalog: DataCatalog,
}

impl ModelCheckpoint {
    /// Create an unsaved checkpoint with a fresh uuid.
    #[must_use]
    pub fn new(
        use_case: &MlUseCase,
        version: Version,
        dataset_batch: GenericBatch,
        input_catalog: DataCatalog,
        output_catalog: DataCatalog,
    ) -> Self {
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            use_case: use_case.clone(),
            version,
            dataset_batch,
            input_catalog,
            output_catalog,
            model_type: None,
            model_bytes_path: None,
            parent_checkpoint: None,
        }
    }

    /// Record the checkpoint this one was derived from.
    #[must_use]
    pub fn with_parent(mut self, parent: ArtefactId) -> Self {
        self.parent_checkpoint = Some(parent);
        self
    }

    /// Store id, `None` until saved.
    #[must_use]
    pub const fn id(&self) -> Option<ArtefactId> {
        self.id
    }

    /// Unique id, also the model file name.
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Owning use case.
    #[must_use]
    pub const fn use_case(&self) -> &MlUseCase {
        &self.use_case
    }

    /// Checkpoint version.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Training batch.
    #[must_use]
    pub const fn dataset_batch(&self) -> &GenericBatch {
        &self.dataset_batch
    }

    /// Catalog the model consumes.
    #[must_use]
    pub const fn input_catalog(&self) -> &DataCatalog {
        &self.input_catalog
    }

    /// Catalog the model produces.
    #[must_use]
    pub const fn output_catalog(&self) -> &DataCatalog {
        &self.output_catalog
    }

    /// Serializer key of the stored model, once stored.
    #[must_use]
    pub fn model_type(&self) -> Option<&str> {
        self.model_type.as_deref()
    }

    /// Location of the model bytes, once stored.
    #[must_use]
    pub fn model_bytes_path(&self) -> Option<&Path> {
        self.model_bytes_path.as_deref()
    }

    /// Predecessor checkpoint, if derived through an update.
    #[must_use]
    pub const fn parent_checkpoint(&self) -> Option<ArtefactId> {
        self.parent_checkpoint
    }

    pub(crate) fn set_model_location(&mut self, model_type: String, path: PathBuf) {
        self.model_type = Some(model_type);
        self.model_bytes_path = Some(path);
    }

    /// Rebuild a saved checkpoint once its parents are loaded.
    pub(crate) fn from_record(
        record: &ArtefactRecord,
        use_case: MlUseCase,
        dataset_batch: GenericBatch,
    ) -> Result<Self> {
        record.expect_type(CHECKPOINT_TYPE_NAME)?;
        let payload = CheckpointPayload::deserialize(&record.data).map_err(|e| {
            Error::Serialization(format!("malformed <{CHECKPOINT_TYPE_NAME}> payload: {e}"))
        })?;
        Ok(Self {
            id: Some(record.id),
            uuid: payload.uuid,
            use_case,
            version: payload.version,
            dataset_batch,
            input_catalog: DataCatalog::from_json(&payload.input_catalog)?,
            output_catalog: DataCatalog::from_json(&payload.output_catalog)?,
            model_type: Some(payload.model_type),
            model_bytes_path: Some(payload.model_bytes_path),
            parent_checkpoint: optional_parent(&record.parents, record.id, CHECKPOINT_PARENT)?,
        })
    }
}

/// Type descriptor of checkpoint artefacts.
#[must_use]
pub fn checkpoint_class() -> ArtefactClass {
    ArtefactClass::new(
        CHECKPOINT_TYPE_NAME,
        json!({
            "type": "object",
            "properties": {
                "uuid": {"type": "string", "description": "unique id of the checkpoint"},
                "version": {"type": "string", "description": "semantic version of the checkpoint"},
                "model_bytes_path": {"type": "string", "description": "location of the model bytes"},
                "model_type": {"type": "string", "description": "serializer key of the model"},
                "input_catalog": DataCatalog::json_schema(),
                "output_catalog": DataCatalog::json_schema()
            },
            "required": ["uuid", "version", "model_bytes_path", "model_type", "input_catalog", "output_catalog"]
        }),
    )
}

impl Entity for ModelCheckpoint {
    fn artefact_class() -> ArtefactClass {
        checkpoint_class()
    }

    fn artefact_id(&self) -> Option<ArtefactId> {
        self.id
    }

    fn assign_id(&mut self, id: ArtefactId) {
        self.id = Some(id);
    }

    fn to_artefact_json(&self) -> Result<Value> {
        let (Some(model_type), Some(path)) = (&self.model_type, &self.model_bytes_path) else {
            return Err(Error::Serialization(format!(
                "checkpoint {} has no stored model, save it with `LineageStore::save_checkpoint`",
                self.uuid
            )));
        };
        let path = path.to_str().ok_or_else(|| {
            Error::Serialization(format!("model path {} is not valid UTF-8", path.display()))
        })?;
        Ok(json!({
            "uuid": self.uuid.to_string(),
            "version": self.version,
            "model_bytes_path": path,
            "model_type": model_type,
            "input_catalog": self.input_catalog.to_json(),
            "output_catalog": self.output_catalog.to_json(),
        }))
    }

    fn relationships(&self) -> Vec<Relationship> {
        // the use case edge goes last: it is what makes the checkpoint a
        // candidate for `get_latest_checkpoint`
        let mut relationships = vec![Relationship::new(
            CHECKPOINT_DATASET_BATCH,
            self.dataset_batch.id,
            None,
        )];
        if let Some(parent) = self.parent_checkpoint {
            relationships.push(Relationship::new(CHECKPOINT_PARENT, Some(parent), None));
        }
        relationships.push(Relationship::new(CHECKPOINT_USE_CASE, self.use_case.id(), None));
        relationships
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Dtype, Feature};

    fn batch() -> GenericBatch {
        GenericBatch {
            id: Some(ArtefactId(2)),
            formula_id: Some(ArtefactId(1)),
            formula_name: "prices".to_string(),
            formula_type: "streaming_formula".to_string(),
            formula_version: Version::new(0, 1, 0),
            output_catalog: DataCatalog::default(),
            batch_epoch: 100,
            batch_kwargs: json!({}),
        }
    }

    fn checkpoint() -> ModelCheckpoint {
        let catalog = DataCatalog::new([Feature::new("y", Dtype::Float64, vec![-1]).unwrap()]).unwrap();
        ModelCheckpoint::new(
            &MlUseCase::new("churn", ""),
            Version::new(0, 1, 0),
            batch(),
            catalog.clone(),
            catalog,
        )
    }

    #[test]
    fn test_payload_requires_stored_model() {
        let mut checkpoint = checkpoint();
        assert!(matches!(
            checkpoint.to_artefact_json(),
            Err(Error::Serialization(_))
        ));
        checkpoint.set_model_location("linear".to_string(), PathBuf::from("/tmp/m/churn/x"));
        let json = checkpoint.to_artefact_json().unwrap();
        assert!(checkpoint_class().validate(&json).is_ok());
        assert_eq!(json["version"], "0.1.0");
    }

    #[test]
    fn test_relationships() {
        let checkpoint = checkpoint().with_parent(ArtefactId(9));
        let relationships = checkpoint.relationships();
        let kinds: Vec<&str> = relationships.iter().map(Relationship::relationship_type).collect();
        assert_eq!(kinds, [CHECKPOINT_DATASET_BATCH, CHECKPOINT_PARENT, CHECKPOINT_USE_CASE]);
        // the use case is not saved
        assert!(relationships[2].ensure_parent_saved().is_err());
        assert_eq!(relationships[1].parent(), Some(ArtefactId(9)));
    }

    #[test]
    fn test_fresh_uuids() {
        assert_ne!(checkpoint().uuid(), checkpoint().uuid());
    }
}
