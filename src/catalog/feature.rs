//! Feature descriptors: typed, shaped tensors independent of any ML stack

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Axis size meaning "any size on this axis".
pub const ANY_AXIS: i64 = -1;

/// Element type of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// UTF-8 string
    String,
}

impl Dtype {
    /// Canonical lowercase name (`"float32"`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::String => "string",
        }
    }
}

/// Abstract description of an array/tensor flowing between ML components.
///
/// Features do not hold data, they describe it. A shape axis of
/// [`ANY_AXIS`] accepts any size on that axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawFeature")]
pub struct Feature {
    name: String,
    dtype: Dtype,
    shape: Vec<i64>,
}

/// Serialized feature before shape validation.
#[derive(Deserialize)]
pub(super) struct RawFeature {
    name: String,
    dtype: Dtype,
    shape: Vec<i64>,
}

impl TryFrom<RawFeature> for Feature {
    type Error = Error;

    fn try_from(raw: RawFeature) -> Result<Self> {
        Self::new(raw.name, raw.dtype, raw.shape)
    }
}

impl Feature {
    /// Create a feature, validating its shape.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if any axis size is below `-1`.
    pub fn new(name: impl Into<String>, dtype: Dtype, shape: impl Into<Vec<i64>>) -> Result<Self> {
        let feature = Self {
            name: name.into(),
            dtype,
            shape: shape.into(),
        };
        feature.validate_shape()?;
        Ok(feature)
    }

    /// Feature name, unique within a catalog.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element type.
    #[must_use]
    pub const fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// Shape, `-1` marks a wildcard axis.
    #[must_use]
    pub fn shape(&self) -> &[i64] {
        &self.shape
    }

    /// Check that every axis size is `>= -1`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the offending axis size.
    pub fn validate_shape(&self) -> Result<()> {
        if let Some(axis_size) = self.shape.iter().find(|&&size| size < ANY_AXIS) {
            return Err(Error::Validation(format!(
                "feature <{}> cannot have an axis of size {axis_size} (full shape: {:?})",
                self.name, self.shape
            )));
        }
        Ok(())
    }

    /// Whether `other` can be served where `self` is expected.
    ///
    /// Same name, same dtype, same rank, and every axis either equal or a
    /// wildcard on `self`'s side.
    #[must_use]
    pub fn accepts(&self, other: &Self) -> bool {
        self.name == other.name
            && self.dtype == other.dtype
            && self.shape.len() == other.shape.len()
            && self
                .shape
                .iter()
                .zip(&other.shape)
                .all(|(&mine, &theirs)| mine == ANY_AXIS || mine == theirs)
    }

    /// JSON schema of a serialized feature.
    #[must_use]
    pub fn json_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "dtype": {"type": "string", "enum": ["int32", "int64", "float32", "float64", "string"]},
                "shape": {"type": "array", "items": {"type": "integer"}}
            },
            "required": ["name", "dtype", "shape"]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_rejects_negative_axes() {
        assert!(Feature::new("x", Dtype::Float32, vec![-1, 3]).is_ok());
        let err = Feature::new("x", Dtype::Float32, vec![-2, 3]).unwrap_err();
        assert!(err.to_string().contains("-2"));
    }

    #[test]
    fn test_accepts_wildcard_only_on_own_side() {
        let wildcard = Feature::new("x", Dtype::Float32, vec![-1, 3]).unwrap();
        let concrete = Feature::new("x", Dtype::Float32, vec![10, 3]).unwrap();
        assert!(wildcard.accepts(&concrete));
        assert!(!concrete.accepts(&wildcard));
    }

    #[test]
    fn test_accepts_requires_dtype_and_rank() {
        let base = Feature::new("x", Dtype::Float32, vec![-1, 3]).unwrap();
        let other_dtype = Feature::new("x", Dtype::Float64, vec![-1, 3]).unwrap();
        let other_rank = Feature::new("x", Dtype::Float32, vec![-1, 3, 1]).unwrap();
        assert!(!base.accepts(&other_dtype));
        assert!(!base.accepts(&other_rank));
    }

    #[test]
    fn test_deserialize_validates_shape() {
        let json = serde_json::json!({"name": "x", "dtype": "int64", "shape": [-5]});
        assert!(serde_json::from_value::<Feature>(json).is_err());

        let json = serde_json::json!({"name": "x", "dtype": "int64", "shape": [4]});
        let feature: Feature = serde_json::from_value(json).unwrap();
        assert_eq!(feature.dtype(), Dtype::Int64);
    }
}
