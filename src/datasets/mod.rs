//! Dataset formulas and batches
//!
//! ```text
//! DatasetFormula (dataset_formula)
//!        │ batch_formula (singleton per batch)
//!        ▼
//! DatasetBatch (dataset_batch) ──checkpoint_dataset_batch──▶ ModelCheckpoint
//! ```
//!
//! A formula is a versioned dataset recipe; each batch is a reproducible
//! instance of it. Formula kinds ([`FormulaKind`]) and batch kinds
//! ([`BatchKind`]) are plain traits: [`StreamingFormula`] with
//! [`FileBatch`] is the built-in pair.

mod batch;
mod formula;
mod store;
mod streaming;

pub use batch::{batch_class, BatchKind, DatasetBatch, GenericBatch, BATCH_FORMULA, BATCH_TYPE_NAME};
pub use formula::{formula_class, DatasetFormula, FormulaKind, FORMULA_TYPE_NAME};
pub use streaming::{FileBatch, StreamingFormula};
