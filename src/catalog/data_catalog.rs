//! Data catalogs: the formal interface between two ML components

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::feature::RawFeature;
use super::Feature;
use crate::{Error, Result};

/// Named set of features describing a data interface.
///
/// Lookup is by name; insertion order is kept so serialization is
/// deterministic. Equality ignores order.
///
/// ```rust
/// use trueno_lineage::catalog::{DataCatalog, Dtype, Feature};
///
/// let training = DataCatalog::new([
///     Feature::new("X", Dtype::Float32, vec![-1, 45])?,
///     Feature::new("y", Dtype::Float32, vec![-1, 2])?,
/// ])?;
/// let predict = DataCatalog::new([Feature::new("X", Dtype::Float32, vec![-1, 45])?])?;
///
/// assert!(training.includes(&predict));
/// assert!(!predict.includes(&training));
/// # Ok::<(), trueno_lineage::Error>(())
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "RawCatalog", into = "CatalogRepr")]
pub struct DataCatalog {
    features: Vec<Feature>,
    index: FxHashMap<String, usize>,
}

#[derive(Serialize)]
struct CatalogRepr {
    features: Vec<Feature>,
}

/// Serialized catalog with its features not yet validated.
#[derive(Deserialize)]
struct RawCatalog {
    features: Vec<RawFeature>,
}

impl TryFrom<RawCatalog> for DataCatalog {
    type Error = Error;

    fn try_from(raw: RawCatalog) -> Result<Self> {
        let features = raw
            .features
            .into_iter()
            .map(Feature::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::new(features)
    }
}

impl From<DataCatalog> for CatalogRepr {
    fn from(catalog: DataCatalog) -> Self {
        Self {
            features: catalog.features,
        }
    }
}

impl DataCatalog {
    /// Build a catalog from features.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] on duplicate feature names.
    pub fn new(features: impl IntoIterator<Item = Feature>) -> Result<Self> {
        let mut catalog = Self::default();
        for feature in features {
            catalog.add_feature(feature)?;
        }
        Ok(catalog)
    }

    /// Append a feature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if a feature with the same name exists.
    pub fn add_feature(&mut self, feature: Feature) -> Result<()> {
        if self.index.contains_key(feature.name()) {
            return Err(Error::Validation(format!(
                "duplicate features with the name {}",
                feature.name()
            )));
        }
        self.index
            .insert(feature.name().to_string(), self.features.len());
        self.features.push(feature);
        Ok(())
    }

    /// Get a feature by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Feature> {
        self.index.get(name).map(|&idx| &self.features[idx])
    }

    /// Features in insertion order.
    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the catalog has no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Check whether `other` is included in this catalog.
    ///
    /// Every feature of `other` must have a same-named, same-dtype feature
    /// here whose shape accepts it (same rank, each axis equal or `-1` on
    /// this side).
    #[must_use]
    pub fn includes(&self, other: &Self) -> bool {
        other.features.iter().all(|theirs| {
            self.get(theirs.name())
                .is_some_and(|mine| mine.accepts(theirs))
        })
    }

    /// Names of the features of `other` this catalog fails to include.
    #[must_use]
    pub fn missing_from(&self, other: &Self) -> Vec<String> {
        other
            .features
            .iter()
            .filter(|theirs| {
                !self
                    .get(theirs.name())
                    .is_some_and(|mine| mine.accepts(theirs))
            })
            .map(|feature| feature.name().to_string())
            .collect()
    }

    /// Serialize to `{"features": [{name, dtype, shape}, ...]}`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "features": self.features })
    }

    /// Deserialize from the representation produced by [`Self::to_json`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] on duplicate names or invalid shapes and
    /// [`Error::Serialization`] on malformed JSON.
    pub fn from_json(catalog_json: &serde_json::Value) -> Result<Self> {
        let raw = RawCatalog::deserialize(catalog_json)
            .map_err(|e| Error::Serialization(format!("malformed catalog JSON: {e}")))?;
        Self::try_from(raw)
    }

    /// JSON schema of a serialized catalog.
    #[must_use]
    pub fn json_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "features": {"type": "array", "items": Feature::json_schema()}
            },
            "required": ["features"]
        })
    }
}

impl PartialEq for DataCatalog {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .features
                .iter()
                .all(|feature| other.get(feature.name()) == Some(feature))
    }
}

impl Eq for DataCatalog {}
