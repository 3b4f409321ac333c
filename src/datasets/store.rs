//! Dataset operations on the lineage store

use serde_json::json;
use tracing::{debug, info, warn};

use super::batch::{BATCH_FORMULA, BATCH_TYPE_NAME};
use super::formula::FORMULA_TYPE_NAME;
use super::{DatasetBatch, DatasetFormula, FormulaKind, GenericBatch};
use crate::graph::{ArtefactId, Entity, QueryFilters};
use crate::{Error, LineageStore, Result, Version};

impl LineageStore {
    fn formula_candidates<K: FormulaKind>(
        &self,
        name: &str,
        version: Option<Version>,
    ) -> Result<Vec<DatasetFormula<K>>> {
        let mut filters = QueryFilters::new();
        filters.insert("formula_name".to_string(), json!(name));
        filters.insert("formula_type".to_string(), json!(K::FORMULA_TYPE));
        if let Some(version) = version {
            filters.insert("version".to_string(), json!(version));
        }
        self.query(FORMULA_TYPE_NAME, &filters)?
            .iter()
            .map(DatasetFormula::from_record)
            .collect()
    }

    /// Find a formula of kind `K` by name.
    ///
    /// With a requested `version`, the formula saved under that exact version
    /// is returned. Without one, or when the requested version does not
    /// exist, the highest saved version is returned. No formula of that name
    /// is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Loading`] when several formulas share the selected
    /// version, and deserialization errors of stored payloads.
    pub fn get_formula<K: FormulaKind>(
        &self,
        name: &str,
        version: Option<Version>,
    ) -> Result<Option<DatasetFormula<K>>> {
        let mut candidates = self.formula_candidates::<K>(name, None)?;
        if candidates.is_empty() {
            debug!(formula_name = name, "formula not found");
            return Ok(None);
        }
        candidates.sort_by_key(DatasetFormula::version);
        let selected = match version {
            Some(requested) if candidates.iter().any(|f| f.version() == requested) => requested,
            Some(requested) => {
                let highest = candidates[candidates.len() - 1].version();
                warn!(
                    formula_name = name,
                    requested = %requested,
                    returned = %highest,
                    "requested formula version not found, returning the highest version"
                );
                highest
            }
            None => candidates[candidates.len() - 1].version(),
        };
        let mut matching = candidates.into_iter().filter(|f| f.version() == selected);
        match (matching.next(), matching.next()) {
            (Some(formula), None) => Ok(Some(formula)),
            (Some(_), Some(_)) => Err(Error::Loading(format!(
                "got more than one formula <{name}> with version {selected}"
            ))),
            (None, _) => Ok(None),
        }
    }

    /// Save a formula unless the same name, kind and version is already
    /// stored, in which case the stored id is adopted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] when the stored formula with that version
    /// has a different catalog or arguments (bump the version instead), and
    /// [`Error::Loading`] when several are stored.
    pub fn save_formula<K: FormulaKind>(&self, formula: &mut DatasetFormula<K>) -> Result<ArtefactId> {
        if let Some(id) = formula.artefact_id() {
            return Ok(id);
        }
        let mut existing =
            self.formula_candidates::<K>(formula.formula_name(), Some(formula.version()))?;
        match existing.len() {
            0 => self.save(formula),
            1 => {
                let remote = existing.remove(0);
                let id = remote.artefact_id().ok_or_else(|| {
                    Error::Store("stored formula came back without an id".to_string())
                })?;
                if remote.output_catalog() != formula.output_catalog() || remote.kind() != formula.kind() {
                    return Err(Error::Conflict(format!(
                        "formula <{}> version {} is already saved with a different definition, bump its version",
                        formula.formula_name(),
                        formula.version()
                    )));
                }
                info!(formula_name = formula.formula_name(), artefact_id = %id, "adopted stored formula");
                formula.assign_id(id);
                Ok(id)
            }
            _ => Err(Error::Loading(format!(
                "got more than one formula <{}> with version {}",
                formula.formula_name(),
                formula.version()
            ))),
        }
    }

    /// All batches of a saved formula, oldest epoch first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Loading`] for an unsaved formula or corrupt lineage.
    pub fn get_formula_batches<F: FormulaKind>(
        &self,
        formula: &DatasetFormula<F>,
    ) -> Result<Vec<DatasetBatch<F>>> {
        let edges = self.child_edges(formula.artefact_id(), BATCH_FORMULA, "batches")?;
        let mut batches = edges
            .iter()
            .map(|edge| {
                let record = self.fetch_typed(edge.child, BATCH_TYPE_NAME)?;
                DatasetBatch::from_record(&record, formula)
            })
            .collect::<Result<Vec<_>>>()?;
        batches.sort_by_key(|batch| (batch.batch_epoch(), batch.artefact_id()));
        Ok(batches)
    }

    /// The batch of a saved formula with the highest `batch_epoch`, or
    /// `None` when it has no batch yet.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_formula_batches`].
    pub fn get_latest_batch<F: FormulaKind>(
        &self,
        formula: &DatasetFormula<F>,
    ) -> Result<Option<DatasetBatch<F>>> {
        Ok(self.get_formula_batches(formula)?.pop())
    }

    /// Reload a batch without knowing its formula kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Loading`] when the batch is missing or its formula
    /// edge is missing or ambiguous.
    pub fn get_batch_from_id(&self, id: ArtefactId) -> Result<GenericBatch> {
        let record = self.fetch_typed(id, BATCH_TYPE_NAME)?;
        let formula_id = record.singleton_parent(BATCH_FORMULA)?;
        let formula = self.fetch_typed(formula_id, FORMULA_TYPE_NAME)?;
        GenericBatch::from_records(&record, &formula)
    }

    /// Reload a fully typed batch and its formula.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Loading`] when the formula is of another kind (use
    /// [`Self::get_batch_from_id`] for a generic view) or the lineage is
    /// corrupt.
    pub fn load_batch<F: FormulaKind>(&self, id: ArtefactId) -> Result<DatasetBatch<F>> {
        let record = self.fetch_typed(id, BATCH_TYPE_NAME)?;
        let formula_id = record.singleton_parent(BATCH_FORMULA)?;
        let formula = DatasetFormula::<F>::from_record(&self.fetch(formula_id)?)?;
        DatasetBatch::from_record(&record, &formula)
    }

    /// Cut the next, unsaved, batch of a saved formula.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Loading`] for an unsaved formula and the formula
    /// kind's own errors.
    pub fn new_batch<F: FormulaKind>(&self, formula: &DatasetFormula<F>) -> Result<DatasetBatch<F>> {
        let previous: Vec<F::Batch> = self
            .get_formula_batches(formula)?
            .into_iter()
            .map(|batch| batch.kind().clone())
            .collect();
        let kind = formula.kind().new_batch(&previous)?;
        debug!(
            formula_name = formula.formula_name(),
            previous_batches = previous.len(),
            "cut new batch"
        );
        Ok(DatasetBatch::new(formula, kind))
    }
}
