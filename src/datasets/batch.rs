//! Dataset batches: reproducible instances of a formula

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use super::formula::{FormulaPayload, FORMULA_TYPE_NAME};
use super::{DatasetFormula, FormulaKind};
use crate::catalog::DataCatalog;
use crate::graph::{ArtefactClass, ArtefactId, ArtefactRecord, Entity, Relationship};
use crate::{Error, Result, Version};

/// Artefact type of batches.
pub const BATCH_TYPE_NAME: &str = "dataset_batch";

/// Singleton edge from a formula to each of its batches.
pub const BATCH_FORMULA: &str = "batch_formula";

/// Kind specific content of a batch, stored as `batch_kwargs`.
pub trait BatchKind: Clone + fmt::Debug + PartialEq + Send + Sync + Sized {
    /// Serialize the batch arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if they cannot be represented.
    fn to_kwargs(&self) -> Result<Value>;

    /// Rebuild the batch arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] on malformed arguments.
    fn from_kwargs(kwargs: &Value) -> Result<Self>;
}

#[derive(Debug, Deserialize)]
struct BatchPayload {
    batch_epoch: i64,
    batch_kwargs: Value,
}

impl BatchPayload {
    fn parse(data: &Value) -> Result<Self> {
        Self::deserialize(data)
            .map_err(|e| Error::Serialization(format!("malformed <{BATCH_TYPE_NAME}> payload: {e}")))
    }
}

/// A batch of a formula of kind `F`, fully typed.
///
/// A batch reloaded from the store yields the same data as when it was
/// created, which is what makes training reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetBatch<F: FormulaKind> {
    id: Option<ArtefactId>,
    formula: DatasetFormula<F>,
    batch_epoch: i64,
    kind: F::Batch,
}

impl<F: FormulaKind> DatasetBatch<F> {
    /// Create an unsaved batch stamped with the current UTC time.
    #[must_use]
    pub fn new(formula: &DatasetFormula<F>, kind: F::Batch) -> Self {
        Self {
            id: None,
            formula: formula.clone(),
            batch_epoch: Utc::now().timestamp(),
            kind,
        }
    }

    /// Override the batch epoch (unix seconds).
    #[must_use]
    pub fn with_epoch(mut self, batch_epoch: i64) -> Self {
        self.batch_epoch = batch_epoch;
        self
    }

    /// The formula this batch was cut from.
    #[must_use]
    pub const fn formula(&self) -> &DatasetFormula<F> {
        &self.formula
    }

    /// Unix time the batch was created at.
    #[must_use]
    pub const fn batch_epoch(&self) -> i64 {
        self.batch_epoch
    }

    /// [`Self::batch_epoch`] as a date, `None` if out of range.
    #[must_use]
    pub fn date_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.batch_epoch, 0)
    }

    /// Kind specific content.
    #[must_use]
    pub const fn kind(&self) -> &F::Batch {
        &self.kind
    }

    /// Catalog of the batch data, the formula's output catalog.
    #[must_use]
    pub const fn output_catalog(&self) -> &DataCatalog {
        self.formula.output_catalog()
    }

    /// Degrade to the kind-independent view.
    ///
    /// # Errors
    ///
    /// Propagates [`BatchKind::to_kwargs`] errors.
    pub fn to_generic(&self) -> Result<GenericBatch> {
        Ok(GenericBatch {
            id: self.id,
            formula_id: self.formula.artefact_id(),
            formula_name: self.formula.formula_name().to_string(),
            formula_type: F::FORMULA_TYPE.to_string(),
            formula_version: self.formula.version(),
            output_catalog: self.formula.output_catalog().clone(),
            batch_epoch: self.batch_epoch,
            batch_kwargs: self.kind.to_kwargs()?,
        })
    }

    /// Rebuild a saved batch whose formula is already loaded.
    pub(crate) fn from_record(record: &ArtefactRecord, formula: &DatasetFormula<F>) -> Result<Self> {
        record.expect_type(BATCH_TYPE_NAME)?;
        let formula_id = record.singleton_parent(BATCH_FORMULA)?;
        if formula.artefact_id() != Some(formula_id) {
            return Err(Error::Loading(format!(
                "batch {} belongs to formula {formula_id}, not to <{}>",
                record.id,
                formula.formula_name()
            )));
        }
        let payload = BatchPayload::parse(&record.data)?;
        Ok(Self {
            id: Some(record.id),
            formula: formula.clone(),
            batch_epoch: payload.batch_epoch,
            kind: F::Batch::from_kwargs(&payload.batch_kwargs)?,
        })
    }
}

/// Type descriptor of batch artefacts.
#[must_use]
pub fn batch_class() -> ArtefactClass {
    ArtefactClass::new(
        BATCH_TYPE_NAME,
        json!({
            "type": "object",
            "properties": {
                "batch_epoch": {"type": "integer", "description": "unix time of the batch"},
                "batch_kwargs": {"type": "object", "description": "kind specific batch content"}
            },
            "required": ["batch_epoch", "batch_kwargs"]
        }),
    )
}

impl<F: FormulaKind> Entity for DatasetBatch<F> {
    fn artefact_class() -> ArtefactClass {
        batch_class()
    }

    fn artefact_id(&self) -> Option<ArtefactId> {
        self.id
    }

    fn assign_id(&mut self, id: ArtefactId) {
        self.id = Some(id);
    }

    fn to_artefact_json(&self) -> Result<Value> {
        Ok(json!({
            "batch_epoch": self.batch_epoch,
            "batch_kwargs": self.kind.to_kwargs()?,
        }))
    }

    fn relationships(&self) -> Vec<Relationship> {
        vec![Relationship::new(BATCH_FORMULA, self.formula.artefact_id(), None)]
    }
}

/// Kind-independent view of a batch.
///
/// Used when the formula kind is unknown to the caller, e.g. when a
/// checkpoint is reloaded. It carries the formula metadata but not a typed
/// formula, and cannot be saved.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericBatch {
    /// Batch id
    pub id: Option<ArtefactId>,
    /// Formula id
    pub formula_id: Option<ArtefactId>,
    /// Formula name
    pub formula_name: String,
    /// Formula kind tag
    pub formula_type: String,
    /// Formula version
    pub formula_version: Version,
    /// Formula output catalog
    pub output_catalog: DataCatalog,
    /// Unix time of the batch
    pub batch_epoch: i64,
    /// Raw batch arguments
    pub batch_kwargs: Value,
}

impl GenericBatch {
    /// Rebuild from the batch record and its formula record.
    pub(crate) fn from_records(batch: &ArtefactRecord, formula: &ArtefactRecord) -> Result<Self> {
        batch.expect_type(BATCH_TYPE_NAME)?;
        formula.expect_type(FORMULA_TYPE_NAME)?;
        let payload = BatchPayload::parse(&batch.data)?;
        let formula_payload = FormulaPayload::parse(&formula.data)?;
        Ok(Self {
            id: Some(batch.id),
            formula_id: Some(formula.id),
            output_catalog: formula_payload.catalog()?,
            formula_name: formula_payload.formula_name,
            formula_type: formula_payload.formula_type,
            formula_version: formula_payload.version,
            batch_epoch: payload.batch_epoch,
            batch_kwargs: payload.batch_kwargs,
        })
    }

    /// Whether the batch is persisted.
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        self.id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Dtype, Feature};
    use crate::datasets::{FileBatch, StreamingFormula};

    fn formula() -> DatasetFormula<StreamingFormula> {
        let catalog = DataCatalog::new([Feature::new("x", Dtype::Float32, vec![-1, 1]).unwrap()]).unwrap();
        DatasetFormula::new("prices", Version::new(0, 1, 0), catalog, StreamingFormula::new("/tmp/p"))
    }

    #[test]
    fn test_defaults_to_now() {
        let before = Utc::now().timestamp();
        let batch = DatasetBatch::new(&formula(), FileBatch::new(vec![]));
        assert!(batch.batch_epoch() >= before);
        assert_eq!(batch.with_epoch(100).batch_epoch(), 100);
    }

    #[test]
    fn test_relationship_to_unsaved_formula_has_no_parent() {
        let batch = DatasetBatch::new(&formula(), FileBatch::new(vec![]));
        let relationships = batch.relationships();
        assert_eq!(relationships.len(), 1);
        assert_eq!(relationships[0].relationship_type(), BATCH_FORMULA);
        assert!(relationships[0].ensure_parent_saved().is_err());
    }

    #[test]
    fn test_payload_matches_schema() {
        let batch = DatasetBatch::new(&formula(), FileBatch::new(vec!["a.csv".into()])).with_epoch(7);
        let json = batch.to_artefact_json().unwrap();
        assert!(batch_class().validate(&json).is_ok());
        assert_eq!(json["batch_kwargs"]["files"][0], "a.csv");
    }

    #[test]
    fn test_to_generic_keeps_metadata() {
        let batch = DatasetBatch::new(&formula(), FileBatch::new(vec!["a.csv".into()])).with_epoch(5);
        let generic = batch.to_generic().unwrap();
        assert_eq!(generic.formula_name, "prices");
        assert_eq!(generic.formula_type, StreamingFormula::FORMULA_TYPE);
        assert_eq!(generic.batch_epoch, 5);
        assert!(!generic.is_saved());
    }
}
