//! Tests for error types

use trueno_lineage::graph::ArtefactId;
use trueno_lineage::{Error, Version};

#[test]
fn test_schema_conflict_error() {
    let error = Error::SchemaConflict {
        type_name: "dataset_batch".to_string(),
        reason: "remote schema definition differs".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("dataset_batch"));
    assert!(error_str.contains("Register the new schema under a new type name"));
}

#[test]
fn test_unsaved_reference_error() {
    let error = Error::UnsavedReference("<batch_formula> parent".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("unsaved reference"));
    assert!(error_str.contains("Save the parent artefact"));
}

#[test]
fn test_version_format_error() {
    let error = Version::parse("1.2").unwrap_err();
    let error_str = format!("{error}");
    assert!(error_str.contains("invalid version string: 1.2"));
    assert!(error_str.contains("<major>.<minor>.<patch>"));
}

#[test]
fn test_already_saved_error() {
    let error = Error::AlreadySaved(ArtefactId(7));
    let error_str = format!("{error}");
    assert!(error_str.contains("#7"));
    assert!(error_str.contains("create a new entity"));
}

#[test]
fn test_catalog_incompatibility_error() {
    let error = Error::CatalogIncompatibility("drops output features [\"label\"]".to_string());
    assert!(format!("{error}").starts_with("catalog incompatibility"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "model bytes missing");
    let error: Error = io_error.into();
    assert!(matches!(error, Error::Io(_)));
    assert!(format!("{error}").contains("model bytes missing"));
}

#[test]
fn test_error_debug() {
    let error = Error::Loading("missing relationship".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("Loading"));
}
