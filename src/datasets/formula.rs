//! Dataset formulas: versioned recipes producing dataset batches

use std::fmt;

use serde::Deserialize;
use serde_json::{json, Value};

use super::BatchKind;
use crate::catalog::DataCatalog;
use crate::graph::{ArtefactClass, ArtefactId, ArtefactRecord, Entity, Relationship};
use crate::{Error, Result, Version};

/// Artefact type of formulas.
pub const FORMULA_TYPE_NAME: &str = "dataset_formula";

/// Behaviour specific to one family of formulas.
///
/// Whereas most academic datasets are static, production datasets keep
/// growing; a formula kind knows how to cut the next batch of its dataset.
/// Its arguments are stored as `formula_kwargs` on the formula artefact and
/// `FORMULA_TYPE` selects the kind again on reload.
pub trait FormulaKind: Clone + fmt::Debug + PartialEq + Send + Sync + Sized {
    /// Tag stored as `formula_type`.
    const FORMULA_TYPE: &'static str;

    /// Batches this kind produces.
    type Batch: BatchKind;

    /// Serialize the kind's arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if they cannot be represented.
    fn to_kwargs(&self) -> Result<Value>;

    /// Rebuild the kind from stored arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] on malformed arguments.
    fn from_kwargs(kwargs: &Value) -> Result<Self>;

    /// Cut the next batch, given every batch already saved for the formula.
    ///
    /// # Errors
    ///
    /// Kind specific; IO failures for file based kinds.
    fn new_batch(&self, previous: &[Self::Batch]) -> Result<Self::Batch>;
}

/// Stored formula payload, independent of the formula kind.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FormulaPayload {
    pub(crate) formula_name: String,
    pub(crate) formula_type: String,
    pub(crate) version: Version,
    pub(crate) output_catalog: Value,
    pub(crate) formula_kwargs: Value,
}

impl FormulaPayload {
    pub(crate) fn parse(data: &Value) -> Result<Self> {
        Self::deserialize(data)
            .map_err(|e| Error::Serialization(format!("malformed <{FORMULA_TYPE_NAME}> payload: {e}")))
    }

    pub(crate) fn catalog(&self) -> Result<DataCatalog> {
        DataCatalog::from_json(&self.output_catalog)
    }
}

/// A versioned dataset recipe.
///
/// ```rust
/// use std::path::PathBuf;
/// use trueno_lineage::catalog::{DataCatalog, Dtype, Feature};
/// use trueno_lineage::datasets::{DatasetFormula, StreamingFormula};
/// use trueno_lineage::graph::Entity;
/// use trueno_lineage::Version;
///
/// let catalog = DataCatalog::new([Feature::new("x", Dtype::Float32, vec![-1, 1])?])?;
/// let formula = DatasetFormula::new(
///     "prices",
///     Version::new(0, 1, 0),
///     catalog,
///     StreamingFormula::new(PathBuf::from("/data/prices")),
/// );
/// let json = formula.to_artefact_json()?;
/// let back = DatasetFormula::<StreamingFormula>::from_artefact_json(&json)?;
/// assert_eq!(back.formula_name(), "prices");
/// # Ok::<(), trueno_lineage::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetFormula<K: FormulaKind> {
    id: Option<ArtefactId>,
    formula_name: String,
    version: Version,
    output_catalog: DataCatalog,
    kind: K,
}

impl<K: FormulaKind> DatasetFormula<K> {
    /// Create an unsaved formula.
    #[must_use]
    pub fn new(
        formula_name: impl Into<String>,
        version: Version,
        output_catalog: DataCatalog,
        kind: K,
    ) -> Self {
        Self {
            id: None,
            formula_name: formula_name.into(),
            version,
            output_catalog,
            kind,
        }
    }

    /// Formula name.
    #[must_use]
    pub fn formula_name(&self) -> &str {
        &self.formula_name
    }

    /// Formula version.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Catalog of the data every batch yields.
    #[must_use]
    pub const fn output_catalog(&self) -> &DataCatalog {
        &self.output_catalog
    }

    /// Kind specific arguments.
    #[must_use]
    pub const fn kind(&self) -> &K {
        &self.kind
    }

    /// Rebuild an unsaved formula from its payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] on a malformed payload and
    /// [`Error::Loading`] when the payload belongs to another formula kind.
    pub fn from_artefact_json(data: &Value) -> Result<Self> {
        let payload = FormulaPayload::parse(data)?;
        if payload.formula_type != K::FORMULA_TYPE {
            return Err(Error::Loading(format!(
                "formula <{}> is of type <{}>, not <{}>",
                payload.formula_name,
                payload.formula_type,
                K::FORMULA_TYPE
            )));
        }
        Ok(Self {
            id: None,
            output_catalog: payload.catalog()?,
            kind: K::from_kwargs(&payload.formula_kwargs)?,
            formula_name: payload.formula_name,
            version: payload.version,
        })
    }

    /// Rebuild a saved formula from its store record.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_artefact_json`], plus [`Error::Loading`] when the
    /// record is not a formula.
    pub fn from_record(record: &ArtefactRecord) -> Result<Self> {
        record.expect_type(FORMULA_TYPE_NAME)?;
        let mut formula = Self::from_artefact_json(&record.data)?;
        formula.id = Some(record.id);
        Ok(formula)
    }
}

/// Type descriptor of formula artefacts.
#[must_use]
pub fn formula_class() -> ArtefactClass {
    ArtefactClass::new(
        FORMULA_TYPE_NAME,
        json!({
            "type": "object",
            "properties": {
                "formula_name": {"type": "string", "description": "name of the formula"},
                "formula_type": {"type": "string", "description": "formula kind, selects the batch type"},
                "version": {"type": "string", "description": "semantic version of the formula"},
                "output_catalog": DataCatalog::json_schema(),
                "formula_kwargs": {"type": "object", "description": "kind specific arguments"}
            },
            "required": ["formula_name", "formula_type", "version", "output_catalog", "formula_kwargs"]
        }),
    )
}

impl<K: FormulaKind> Entity for DatasetFormula<K> {
    fn artefact_class() -> ArtefactClass {
        formula_class()
    }

    fn artefact_id(&self) -> Option<ArtefactId> {
        self.id
    }

    fn assign_id(&mut self, id: ArtefactId) {
        self.id = Some(id);
    }

    fn to_artefact_json(&self) -> Result<Value> {
        Ok(json!({
            "formula_name": self.formula_name,
            "formula_type": K::FORMULA_TYPE,
            "version": self.version,
            "output_catalog": self.output_catalog.to_json(),
            "formula_kwargs": self.kind.to_kwargs()?,
        }))
    }

    fn relationships(&self) -> Vec<Relationship> {
        Vec::new()
    }
}
