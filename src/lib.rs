//! Logistic-regression survival classifier for the Titanic passenger table.
//!
//! The pipeline is `train` → [`eval::cross_validate`] → [`model::save`] →
//! [`model::load`] → [`predict::predict`] / [`predict::predict_one`].  The
//! fitted model is an ordinary value; nothing is held in global state.

pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod model;
pub mod predict;
pub mod report;

use std::path::Path;

pub use error::{Result, TitanicError};
pub use model::{Classifier, LogisticModel};

/// Load the dataset at `path` and fit a logistic regression on its labelled
/// rows.
pub fn train(path: &Path) -> Result<LogisticModel> {
    let dataset = data::load_dataset(path)?;
    LogisticModel::fit(&dataset)
}
