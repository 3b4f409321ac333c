//! Streaming formulas over a directory of files

use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::{BatchKind, FormulaKind};
use crate::{Error, Result};

/// A formula whose data is a directory that keeps receiving new files.
///
/// Each new batch holds the files that no earlier batch took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingFormula {
    data_dir: PathBuf,
}

impl StreamingFormula {
    /// Stream files from `data_dir`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Watched directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => files.push(name),
                Err(raw) => warn!(file = ?raw, "skipping file with a non UTF-8 name"),
            }
        }
        files.sort();
        Ok(files)
    }
}

impl FormulaKind for StreamingFormula {
    const FORMULA_TYPE: &'static str = "streaming_formula";

    type Batch = FileBatch;

    fn to_kwargs(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn from_kwargs(kwargs: &Value) -> Result<Self> {
        Self::deserialize(kwargs)
            .map_err(|e| Error::Serialization(format!("malformed streaming formula kwargs: {e}")))
    }

    fn new_batch(&self, previous: &[FileBatch]) -> Result<FileBatch> {
        let taken: FxHashSet<&str> = previous
            .iter()
            .flat_map(|batch| batch.files.iter().map(String::as_str))
            .collect();
        let files = self
            .list_files()?
            .into_iter()
            .filter(|file| !taken.contains(file.as_str()))
            .collect();
        Ok(FileBatch { files })
    }
}

/// Batch content of a [`StreamingFormula`]: file names relative to the
/// formula's directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBatch {
    files: Vec<String>,
}

impl FileBatch {
    /// Batch of the given files.
    #[must_use]
    pub const fn new(files: Vec<String>) -> Self {
        Self { files }
    }

    /// File names in the batch.
    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Whether the batch holds no file.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl BatchKind for FileBatch {
    fn to_kwargs(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn from_kwargs(kwargs: &Value) -> Result<Self> {
        Self::deserialize(kwargs)
            .map_err(|e| Error::Serialization(format!("malformed file batch kwargs: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_batch_skips_taken_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.csv", "a.csv", "c.csv"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        let formula = StreamingFormula::new(dir.path());

        let first = formula.new_batch(&[]).unwrap();
        assert_eq!(first.files(), ["a.csv", "b.csv", "c.csv"]);

        std::fs::write(dir.path().join("d.csv"), "x").unwrap();
        let second = formula.new_batch(&[first]).unwrap();
        assert_eq!(second.files(), ["d.csv"]);
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let formula = StreamingFormula::new("/definitely/not/here");
        assert!(matches!(formula.new_batch(&[]), Err(Error::Io(_))));
    }

    #[test]
    fn test_kwargs_round_trip() {
        let formula = StreamingFormula::new("/data/prices");
        let kwargs = formula.to_kwargs().unwrap();
        assert_eq!(kwargs["data_dir"], "/data/prices");
        assert_eq!(StreamingFormula::from_kwargs(&kwargs).unwrap(), formula);
        assert!(FileBatch::from_kwargs(&serde_json::json!({"files": 3})).is_err());
    }
}
