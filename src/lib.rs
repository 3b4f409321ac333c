//! # Trueno-Lineage: Artefact Lineage and Versioning for ML
//!
//! **Version**: 0.1.0
//!
//! Trueno-Lineage tracks machine-learning artefacts (dataset formulas,
//! dataset batches, model checkpoints, use cases) as schema-validated,
//! versioned nodes of a lineage graph held in an external graph store.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Poka-Yoke safety**: payloads are validated against their type schema
//!   before every save, unsaved parents fail fast
//! - **Jidoka**: corrupt lineage (missing or ambiguous singleton edges,
//!   cycles) stops reloading with a `Loading` error instead of guessing
//! - **Genchi Genbutsu**: typed entities are always rebuilt from what the
//!   store actually holds, never from cached object graphs
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use trueno_lineage::catalog::{DataCatalog, Dtype, Feature};
//! use trueno_lineage::datasets::{DatasetBatch, DatasetFormula, FileBatch, StreamingFormula};
//! use trueno_lineage::graph::MemoryGraphStore;
//! use trueno_lineage::{LineageStore, Version};
//!
//! let store = LineageStore::new(Arc::new(MemoryGraphStore::new()));
//! let catalog = DataCatalog::new([Feature::new("x", Dtype::Float32, vec![-1, 1])?])?;
//! let mut formula = DatasetFormula::new(
//!     "prices",
//!     Version::new(0, 1, 0),
//!     catalog,
//!     StreamingFormula::new("/data/prices"),
//! );
//! store.save(&mut formula)?;
//!
//! for epoch in [100, 200] {
//!     let mut batch = DatasetBatch::new(&formula, FileBatch::default()).with_epoch(epoch);
//!     store.save(&mut batch)?;
//! }
//! let latest = store.get_latest_batch(&formula)?.expect("two batches saved");
//! assert_eq!(latest.batch_epoch(), 200);
//! # Ok::<(), trueno_lineage::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod catalog;
pub mod config;
pub mod datasets;
pub mod error;
pub mod events;
pub mod graph;
pub mod logging;
pub mod models;
pub mod registry;
pub mod schema;
pub mod store;
pub mod version;

pub use config::LineageConfig;
pub use error::{Error, Result};
pub use events::{LineageEvent, LineageNotifier, NoopNotifier, TracingNotifier};
pub use registry::Registry;
pub use store::{LineageStore, LineageStoreBuilder};
pub use version::Version;
