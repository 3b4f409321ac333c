//! Validation of concrete data pieces against an abstract catalog

use serde_json::Value;

use super::{DataCatalog, Dtype, Feature, ANY_AXIS};
use crate::{Error, Result};

/// Validates a stack-specific piece of data against a catalog.
///
/// Implementations exist per data representation (data frames, tensors,
/// JSON columns, ...); the catalog itself stays stack agnostic.
pub trait CatalogValidator<D: ?Sized> {
    /// Check `data` against `catalog`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing the first mismatch.
    fn validate(&self, data: &D, catalog: &DataCatalog) -> Result<()>;
}

/// Validates a JSON object mapping feature names to (nested) arrays.
///
/// Every catalog feature must be present with the right rank, concrete axis
/// sizes and element type. Extra columns are allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonColumnsValidator;

impl CatalogValidator<Value> for JsonColumnsValidator {
    fn validate(&self, data: &Value, catalog: &DataCatalog) -> Result<()> {
        let columns = data
            .as_object()
            .ok_or_else(|| Error::validation("expected a JSON object of feature columns"))?;
        for feature in catalog.features() {
            let column = columns.get(feature.name()).ok_or_else(|| {
                Error::Validation(format!("missing column for feature <{}>", feature.name()))
            })?;
            validate_column(feature, column)?;
        }
        Ok(())
    }
}

fn validate_column(feature: &Feature, column: &Value) -> Result<()> {
    let mut shape = Vec::with_capacity(feature.shape().len());
    let mut leaves = Vec::new();
    collect(column, 0, &mut shape, &mut leaves).map_err(|reason| {
        Error::Validation(format!("feature <{}>: {reason}", feature.name()))
    })?;
    if leaves.iter().any(|&(_, depth)| depth != shape.len()) {
        return Err(Error::Validation(format!(
            "feature <{}>: ragged array, scalars found at different depths",
            feature.name()
        )));
    }

    if shape.len() != feature.shape().len() {
        return Err(Error::Validation(format!(
            "feature <{}> expects rank {}, got rank {}",
            feature.name(),
            feature.shape().len(),
            shape.len()
        )));
    }
    for (axis, (&expected, &actual)) in feature.shape().iter().zip(&shape).enumerate() {
        if expected != ANY_AXIS && expected != actual {
            return Err(Error::Validation(format!(
                "feature <{}> axis {axis} expects size {expected}, got {actual}",
                feature.name()
            )));
        }
    }
    if let Some((leaf, _)) = leaves
        .iter()
        .find(|(leaf, _)| !matches_dtype(feature.dtype(), leaf))
    {
        return Err(Error::Validation(format!(
            "feature <{}> expects {} values, got {leaf}",
            feature.name(),
            feature.dtype().as_str()
        )));
    }
    Ok(())
}

/// Walk a nested array, recording the size of each axis and the depth of
/// every scalar.
fn collect<'a>(
    value: &'a Value,
    depth: usize,
    shape: &mut Vec<i64>,
    leaves: &mut Vec<(&'a Value, usize)>,
) -> std::result::Result<(), String> {
    match value {
        Value::Array(items) => {
            let len = i64::try_from(items.len()).map_err(|_| "axis too large".to_string())?;
            match shape.get(depth) {
                Some(&known) if known != len => {
                    return Err(format!("ragged array at axis {depth}: {known} vs {len}"));
                }
                Some(_) => {}
                None if depth == shape.len() => shape.push(len),
                None => return Err(format!("ragged array at axis {depth}")),
            }
            for item in items {
                collect(item, depth + 1, shape, leaves)?;
            }
            Ok(())
        }
        leaf => {
            leaves.push((leaf, depth));
            Ok(())
        }
    }
}

fn matches_dtype(dtype: Dtype, value: &Value) -> bool {
    match dtype {
        Dtype::Int32 => value
            .as_i64()
            .is_some_and(|v| i32::try_from(v).is_ok()),
        Dtype::Int64 => value.is_i64(),
        Dtype::Float32 | Dtype::Float64 => value.is_number(),
        Dtype::String => value.is_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> DataCatalog {
        DataCatalog::new([
            Feature::new("x", Dtype::Float32, vec![-1, 2]).unwrap(),
            Feature::new("label", Dtype::Int32, vec![-1]).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_valid_columns() {
        let data = json!({"x": [[1.0, 2.0], [3.0, 4.5]], "label": [0, 1], "extra": "ok"});
        assert!(JsonColumnsValidator.validate(&data, &catalog()).is_ok());
    }

    #[test]
    fn test_missing_column() {
        let data = json!({"x": [[1.0, 2.0]]});
        let err = JsonColumnsValidator.validate(&data, &catalog()).unwrap_err();
        assert!(err.to_string().contains("label"));
    }

    #[test]
    fn test_wrong_axis_size() {
        let data = json!({"x": [[1.0, 2.0, 3.0]], "label": [0]});
        let err = JsonColumnsValidator.validate(&data, &catalog()).unwrap_err();
        assert!(err.to_string().contains("axis 1"));
    }

    #[test]
    fn test_ragged_and_dtype_mismatch() {
        let ragged = json!({"x": [[1.0, 2.0], [1.0]], "label": [0, 1]});
        assert!(JsonColumnsValidator.validate(&ragged, &catalog()).is_err());

        let strings = json!({"x": [[1.0, 2.0]], "label": ["a"]});
        assert!(JsonColumnsValidator.validate(&strings, &catalog()).is_err());
    }
}
