//! Lineage Tracking Example
//!
//! Walks a dataset formula through two batches, trains two checkpoints of a
//! use case and prints the resulting lineage.
//!
//! Run with: cargo run --example lineage_tracking

use std::any::Any;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use trueno_lineage::catalog::{DataCatalog, Dtype, Feature};
use trueno_lineage::datasets::{DatasetFormula, StreamingFormula};
use trueno_lineage::graph::{Entity, MemoryGraphStore};
use trueno_lineage::models::{CheckpointUpdate, JsonModelSerializer, MlUseCase, ModelCheckpoint, ModelObject};
use trueno_lineage::{LineageConfig, LineageStore, Registry, Version};

#[derive(Debug, Serialize, Deserialize)]
struct MeanModel {
    mean: f64,
}

impl ModelObject for MeanModel {
    fn model_type(&self) -> &str {
        "mean_model"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn main() -> anyhow::Result<()> {
    trueno_lineage::logging::init();
    println!("=== Trueno-Lineage Lineage Tracking ===\n");

    let workspace = tempfile::tempdir().context("creating scratch directory")?;
    let data_dir = workspace.path().join("prices");
    std::fs::create_dir_all(&data_dir)?;

    let mut registry = Registry::new();
    registry.register_serializer("mean_model", Arc::new(JsonModelSerializer::<MeanModel>::new()));
    let store = LineageStore::builder(Arc::new(MemoryGraphStore::new()))
        .config(
            LineageConfig::builder()
                .model_root(workspace.path().join("models"))
                .build(),
        )
        .registry(registry)
        .build();

    // -------------------------------------------------------------------------
    // 1. Declare a streaming dataset formula
    // -------------------------------------------------------------------------
    println!("1. Saving dataset formula...");
    let catalog = DataCatalog::new([Feature::new("price", Dtype::Float32, vec![-1, 1])?])?;
    let mut formula = DatasetFormula::new(
        "prices",
        Version::new(0, 1, 0),
        catalog.clone(),
        StreamingFormula::new(&data_dir),
    );
    let formula_id = store.save_formula(&mut formula)?;
    println!("   Formula {} v{} saved as {formula_id}", formula.formula_name(), formula.version());

    // -------------------------------------------------------------------------
    // 2. Cut two batches as files arrive
    // -------------------------------------------------------------------------
    println!("\n2. Cutting batches...");
    for (epoch, file) in [(1_700_000_000, "2023-11.csv"), (1_702_600_000, "2023-12.csv")] {
        std::fs::write(data_dir.join(file), "price\n1.0\n")?;
        let mut batch = store.new_batch(&formula)?.with_epoch(epoch);
        store.save(&mut batch)?;
        println!("   Batch @{epoch}: {:?}", batch.kind().files());
    }
    let latest = store
        .get_latest_batch(&formula)?
        .context("formula has batches")?;
    println!("   Latest batch epoch: {}", latest.batch_epoch());

    // -------------------------------------------------------------------------
    // 3. Train a first checkpoint, then a minor update
    // -------------------------------------------------------------------------
    println!("\n3. Saving checkpoints...");
    let mut use_case = MlUseCase::new("price_forecast", "next month average price");
    store.save_use_case(&mut use_case)?;

    let output = DataCatalog::new([Feature::new("forecast", Dtype::Float32, vec![-1])?])?;
    let mut first = ModelCheckpoint::new(
        &use_case,
        Version::new(0, 1, 0),
        latest.to_generic()?,
        catalog.clone(),
        output.clone(),
    );
    store.save_checkpoint(&mut first, &MeanModel { mean: 1.0 })?;

    let mut wider = output.clone();
    wider.add_feature(Feature::new("confidence", Dtype::Float32, vec![-1])?)?;
    let mut second = store.update_minor(
        &use_case,
        CheckpointUpdate {
            dataset_batch: latest.to_generic()?,
            input_catalog: catalog,
            output_catalog: wider,
        },
    )?;
    store.save_checkpoint(&mut second, &MeanModel { mean: 1.1 })?;

    // -------------------------------------------------------------------------
    // 4. Walk the checkpoint lineage
    // -------------------------------------------------------------------------
    println!("\n4. Checkpoint lineage (newest first):");
    for checkpoint in store.checkpoint_lineage(&second)? {
        let model = store.load_model(&checkpoint)?;
        let mean = model
            .downcast_ref::<MeanModel>()
            .map(|m| m.mean)
            .context("mean model expected")?;
        println!(
            "   v{} trained on batch {:?} (mean={mean}), saved: {}",
            checkpoint.version(),
            checkpoint.dataset_batch().id,
            checkpoint.is_saved()
        );
    }

    println!("\n=== Done ===");
    Ok(())
}
