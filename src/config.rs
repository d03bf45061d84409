use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::Survival;
use crate::error::{Result, TitanicError};

/// The record classified at the end of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SampleQuery {
    pub pclass: String,
    pub age: f64,
    pub sex: String,
}

impl Default for SampleQuery {
    fn default() -> Self {
        SampleQuery {
            pclass: "1".to_string(),
            age: 5.0,
            sex: "female".to_string(),
        }
    }
}

/// Paths and parameters for the fixed train → evaluate → save → load →
/// predict run.  Every field has a default, so a config file only needs the
/// keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PipelineConfig {
    pub train: PathBuf,
    pub test: PathBuf,
    pub model: PathBuf,
    pub folds: usize,
    pub seed: u64,
    /// Class the confusion matrix counts as positive.
    pub positive_class: Survival,
    pub sample: SampleQuery,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            train: PathBuf::from("data/titanic.train.arff"),
            test: PathBuf::from("data/titanic.test.arff"),
            model: PathBuf::from("model/titanic.model"),
            folds: 10,
            seed: 1,
            positive_class: Survival::Died,
            sample: SampleQuery::default(),
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config file.  Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TitanicError::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| TitanicError::Config(format!("invalid {}: {e}", path.display())))
    }
}
