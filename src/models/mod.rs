//! Use cases, checkpoints and model serialization
//!
//! ```text
//! MlUseCase ──checkpoint_use_case──▶ ModelCheckpoint ◀──checkpoint_dataset_batch── DatasetBatch
//!                                         │
//!                                         └──checkpoint_parent──▶ derived ModelCheckpoint
//! ```
//!
//! Checkpoints are never updated in place: `update_major`, `update_minor`
//! and `update_patch` derive a new checkpoint from the latest one.

mod checkpoint;
mod serializer;
mod store;
mod use_case;

pub use checkpoint::{
    checkpoint_class, CheckpointUpdate, ModelCheckpoint, CHECKPOINT_DATASET_BATCH, CHECKPOINT_PARENT,
    CHECKPOINT_TYPE_NAME, CHECKPOINT_USE_CASE,
};
pub use serializer::{JsonModelSerializer, ModelObject, ModelSerializer};
pub use use_case::{use_case_class, MlUseCase, USE_CASE_TYPE_NAME};
