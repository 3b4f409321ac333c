//! Model operations on the lineage store

use std::path::Component;

use serde_json::json;
use tracing::{debug, info, warn};

use super::checkpoint::{CHECKPOINT_DATASET_BATCH, CHECKPOINT_PARENT, CHECKPOINT_TYPE_NAME, CHECKPOINT_USE_CASE};
use super::use_case::USE_CASE_TYPE_NAME;
use super::{CheckpointUpdate, MlUseCase, ModelCheckpoint, ModelObject};
use crate::datasets::GenericBatch;
use crate::graph::{latest_child, ArtefactId, Entity, LineageGraph, QueryFilters};
use crate::{Error, LineageStore, Result, Version};

enum Change {
    Major(CheckpointUpdate),
    Minor(CheckpointUpdate),
    Patch(GenericBatch),
}

impl Change {
    const fn label(&self) -> &'static str {
        match self {
            Self::Major(_) => "major",
            Self::Minor(_) => "minor",
            Self::Patch(_) => "patch",
        }
    }

    fn bump(&self, version: Version) -> Result<Version> {
        match self {
            Self::Major(_) => version.next_major(),
            Self::Minor(_) => version.next_minor(),
            Self::Patch(_) => version.next_patch(),
        }
    }
}

impl LineageStore {
    fn use_cases_named(&self, name: &str) -> Result<Vec<MlUseCase>> {
        let mut filters = QueryFilters::new();
        filters.insert("use_case_name".to_string(), json!(name));
        self.query(USE_CASE_TYPE_NAME, &filters)?
            .iter()
            .map(MlUseCase::from_record)
            .collect()
    }

    /// Find a use case by name; `Ok(None)` when there is none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Loading`] when several use cases share the name.
    pub fn get_use_case(&self, name: &str) -> Result<Option<MlUseCase>> {
        let mut found = self.use_cases_named(name)?;
        match found.len() {
            0 | 1 => Ok(found.pop()),
            n => Err(Error::Loading(format!(
                "found {n} use cases named <{name}>, names must be unique"
            ))),
        }
    }

    /// Reload a use case by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Loading`] when the artefact is missing or not a use
    /// case.
    pub fn get_use_case_by_id(&self, id: ArtefactId) -> Result<MlUseCase> {
        MlUseCase::from_record(&self.fetch_typed(id, USE_CASE_TYPE_NAME)?)
    }

    /// Save a use case unless one with the same name exists, in which case
    /// its id is adopted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Loading`] when several use cases share the name and
    /// store errors unchanged.
    pub fn save_use_case(&self, use_case: &mut MlUseCase) -> Result<ArtefactId> {
        if let Some(id) = use_case.id() {
            return Ok(id);
        }
        match self.get_use_case(use_case.name())? {
            None => self.save(use_case),
            Some(remote) => {
                let id = remote
                    .id()
                    .ok_or_else(|| Error::Store("stored use case came back without an id".to_string()))?;
                if remote.description() != use_case.description() {
                    warn!(
                        use_case = use_case.name(),
                        "stored use case has another description, keeping the stored one"
                    );
                }
                info!(use_case = use_case.name(), artefact_id = %id, "adopted stored use case");
                use_case.assign_id(id);
                Ok(id)
            }
        }
    }

    /// Encode `model`, write its bytes under the model root and save the
    /// checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadySaved`], [`Error::UnsavedReference`] when the
    /// use case or batch is unsaved, [`Error::Serialization`] when no
    /// serializer handles the model, [`Error::Io`] when the bytes cannot be
    /// written, and [`Self::save`] errors.
    pub fn save_checkpoint(
        &self,
        checkpoint: &mut ModelCheckpoint,
        model: &dyn ModelObject,
    ) -> Result<ArtefactId> {
        if let Some(id) = checkpoint.id() {
            return Err(Error::AlreadySaved(id));
        }
        for relationship in checkpoint.relationships() {
            relationship.ensure_parent_saved()?;
        }
        let use_case_name = checkpoint.use_case().name();
        let mut components = std::path::Path::new(use_case_name).components();
        if !matches!((components.next(), components.next()), (Some(Component::Normal(_)), None)) {
            return Err(Error::Validation(format!(
                "use case name <{use_case_name}> cannot be used as a model directory"
            )));
        }

        let serializer = self.registry().serializer_for(model.model_type())?;
        let bytes = serializer.encode(model)?;
        let dir = self.config().use_case_dir(use_case_name);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(checkpoint.uuid().to_string());
        std::fs::write(&path, &bytes)?;
        info!(
            use_case = use_case_name,
            model_type = model.model_type(),
            bytes = bytes.len(),
            path = %path.display(),
            "stored model bytes"
        );
        checkpoint.set_model_location(model.model_type().to_string(), path);
        self.save(checkpoint)
    }

    /// Read and decode the model of a stored checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Loading`] when the checkpoint has no stored model,
    /// [`Error::Io`] when the bytes cannot be read and
    /// [`Error::Serialization`] from the serializer.
    pub fn load_model(&self, checkpoint: &ModelCheckpoint) -> Result<Box<dyn ModelObject>> {
        let (Some(model_type), Some(path)) = (checkpoint.model_type(), checkpoint.model_bytes_path())
        else {
            return Err(Error::Loading(format!(
                "checkpoint {} has no stored model",
                checkpoint.uuid()
            )));
        };
        let serializer = self.registry().serializer_for(model_type)?;
        let bytes = std::fs::read(path)?;
        debug!(model_type, path = %path.display(), "loading model bytes");
        serializer.decode(&bytes)
    }

    /// Reload a checkpoint with its use case and generic training batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Loading`] when a singleton edge is missing or
    /// ambiguous.
    pub fn load_checkpoint(&self, id: ArtefactId) -> Result<ModelCheckpoint> {
        let record = self.fetch_typed(id, CHECKPOINT_TYPE_NAME)?;
        let use_case = self.get_use_case_by_id(record.singleton_parent(CHECKPOINT_USE_CASE)?)?;
        let batch = self.get_batch_from_id(record.singleton_parent(CHECKPOINT_DATASET_BATCH)?)?;
        ModelCheckpoint::from_record(&record, use_case, batch)
    }

    /// Most recently created checkpoint of a saved use case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Loading`] for an unsaved use case or corrupt lineage.
    pub fn get_latest_checkpoint(&self, use_case: &MlUseCase) -> Result<Option<ModelCheckpoint>> {
        let parent = use_case.id().ok_or_else(|| {
            Error::Loading(format!(
                "cannot load the checkpoints of use case <{}>, it is not saved yet",
                use_case.name()
            ))
        })?;
        let edges = self.child_edges(Some(parent), CHECKPOINT_USE_CASE, "checkpoints")?;
        latest_child(&edges, parent, CHECKPOINT_USE_CASE)
            .map(|edge| self.load_checkpoint(edge.child))
            .transpose()
    }

    /// Derive the next major checkpoint of a use case.
    ///
    /// The new output catalog must include the latest checkpoint's output
    /// catalog. The returned checkpoint is unsaved; store it with
    /// [`Self::save_checkpoint`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::CatalogIncompatibility`] on an output catalog
    /// regression and [`Error::Loading`] when the use case has no checkpoint.
    pub fn update_major(&self, use_case: &MlUseCase, update: CheckpointUpdate) -> Result<ModelCheckpoint> {
        self.derive_checkpoint(use_case, Change::Major(update))
    }

    /// Derive the next minor checkpoint of a use case.
    ///
    /// # Errors
    ///
    /// Same as [`Self::update_major`].
    pub fn update_minor(&self, use_case: &MlUseCase, update: CheckpointUpdate) -> Result<ModelCheckpoint> {
        self.derive_checkpoint(use_case, Change::Minor(update))
    }

    /// Derive the next patch checkpoint of a use case, trained on
    /// `dataset_batch`. Catalogs are carried over without comparison.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Loading`] when the use case has no checkpoint.
    pub fn update_patch(&self, use_case: &MlUseCase, dataset_batch: GenericBatch) -> Result<ModelCheckpoint> {
        self.derive_checkpoint(use_case, Change::Patch(dataset_batch))
    }

    fn derive_checkpoint(&self, use_case: &MlUseCase, change: Change) -> Result<ModelCheckpoint> {
        let latest = self.get_latest_checkpoint(use_case)?.ok_or_else(|| {
            Error::Loading(format!(
                "use case <{}> has no checkpoint yet, save a first checkpoint before updating it",
                use_case.name()
            ))
        })?;
        let parent = latest
            .id()
            .ok_or_else(|| Error::Store("stored checkpoint came back without an id".to_string()))?;
        let version = change.bump(latest.version())?;
        let label = change.label();

        let (dataset_batch, input_catalog, output_catalog) = match change {
            Change::Major(update) | Change::Minor(update) => {
                if !update.output_catalog.includes(latest.output_catalog()) {
                    let missing = update.output_catalog.missing_from(latest.output_catalog());
                    return Err(Error::CatalogIncompatibility(format!(
                        "{label} update of <{}> to {version} drops or changes output features {missing:?} of checkpoint {}",
                        use_case.name(),
                        latest.version()
                    )));
                }
                (update.dataset_batch, update.input_catalog, update.output_catalog)
            }
            Change::Patch(batch) => (
                batch,
                latest.input_catalog().clone(),
                latest.output_catalog().clone(),
            ),
        };
        info!(
            use_case = use_case.name(),
            update = label,
            from = %latest.version(),
            to = %version,
            "derived checkpoint"
        );
        Ok(
            ModelCheckpoint::new(use_case, version, dataset_batch, input_catalog, output_catalog)
                .with_parent(parent),
        )
    }

    /// A saved checkpoint followed by its ancestors through
    /// `checkpoint_parent` edges, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Loading`] for an unsaved checkpoint, a cycle, or a
    /// chain longer than the configured `max_lineage_depth`.
    pub fn checkpoint_lineage(&self, checkpoint: &ModelCheckpoint) -> Result<Vec<ModelCheckpoint>> {
        let start = checkpoint.id().ok_or_else(|| {
            Error::Loading("cannot walk the lineage of an unsaved checkpoint".to_string())
        })?;
        let mut graph = LineageGraph::new();
        let chain = graph.walk_ancestors(
            start,
            CHECKPOINT_PARENT,
            self.config().max_lineage_depth,
            |id| self.graph().get_incident_relationships(id),
        )?;
        chain.into_iter().map(|id| self.load_checkpoint(id)).collect()
    }
}
