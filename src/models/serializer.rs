//! Model objects and their byte codecs

use std::any::Any;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Error, Result};

/// A trained model held in memory.
///
/// `model_type` is the key serializers are looked up by and is persisted on
/// the checkpoint, so it must be stable across processes.
pub trait ModelObject: Any + Send + Sync {
    /// Stable type key, e.g. `"linear_regression"`.
    fn model_type(&self) -> &str;

    /// Upcast for downcasting to the concrete model.
    fn as_any(&self) -> &dyn Any;
}

impl dyn ModelObject {
    /// Borrow the concrete model.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }
}

/// Converts models to and from bytes.
pub trait ModelSerializer: Send + Sync {
    /// Serializer name, for diagnostics.
    fn name(&self) -> &str;

    /// Encode a model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the model is not of a type this
    /// serializer handles or cannot be encoded.
    fn encode(&self, model: &dyn ModelObject) -> Result<Vec<u8>>;

    /// Decode a model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] on malformed bytes.
    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn ModelObject>>;
}

/// JSON codec for serde-serializable models.
pub struct JsonModelSerializer<T> {
    _model: PhantomData<fn() -> T>,
}

impl<T> JsonModelSerializer<T> {
    /// Create the serializer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _model: PhantomData,
        }
    }
}

impl<T> Default for JsonModelSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ModelSerializer for JsonModelSerializer<T>
where
    T: ModelObject + Serialize + DeserializeOwned,
{
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn encode(&self, model: &dyn ModelObject) -> Result<Vec<u8>> {
        let concrete = model.as_any().downcast_ref::<T>().ok_or_else(|| {
            Error::Serialization(format!(
                "{} cannot encode a model of type <{}>",
                self.name(),
                model.model_type()
            ))
        })?;
        Ok(serde_json::to_vec(concrete)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn ModelObject>> {
        let model: T = serde_json::from_slice(bytes)?;
        Ok(Box::new(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Linear {
        weights: Vec<f64>,
    }

    impl ModelObject for Linear {
        fn model_type(&self) -> &str {
            "linear"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Other;

    impl ModelObject for Other {
        fn model_type(&self) -> &str {
            "other"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_json_serializer_round_trip() {
        let serializer = JsonModelSerializer::<Linear>::new();
        let bytes = serializer
            .encode(&Linear {
                weights: vec![0.5, 2.0],
            })
            .unwrap();
        let decoded = serializer.decode(&bytes).unwrap();
        assert_eq!(
            decoded.downcast_ref::<Linear>().unwrap().weights,
            vec![0.5, 2.0]
        );
    }

    #[test]
    fn test_json_serializer_rejects_foreign_model() {
        let serializer = JsonModelSerializer::<Linear>::new();
        assert!(matches!(
            serializer.encode(&Other),
            Err(Error::Serialization(_))
        ));
        assert!(serializer.decode(b"not json").is_err());
    }
}
