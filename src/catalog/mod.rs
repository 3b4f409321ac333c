//! Data catalogs
//!
//! Catalogs describe the data interface between lineage components
//! (formula outputs, checkpoint inputs and outputs) so that interface
//! regressions surface before a model is published.
//!
//! ```text
//! DataCatalog ──< Feature { name, dtype, shape }
//!
//! A.includes(B)  ⇔  ∀ f ∈ B: ∃ g ∈ A, g.name = f.name ∧ g.dtype = f.dtype
//!                              ∧ rank(g) = rank(f) ∧ ∀ axis: g = f ∨ g = -1
//! ```

mod data_catalog;
mod feature;
mod validator;

pub use data_catalog::DataCatalog;
pub use feature::{Dtype, Feature, ANY_AXIS};
pub use validator::{CatalogValidator, JsonColumnsValidator};
