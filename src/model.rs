use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, Array2};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::data::{Dataset, Nominal, Passenger, Survival};
use crate::error::{Result, TitanicError};

/// Columns of the encoded design matrix: three `pclass` indicators, `age`,
/// and one `sex` indicator (`female` = 1).
pub const FEATURES: usize = 5;
const AGE_COLUMN: usize = 3;
const SEX_COLUMN: usize = 4;

// ---------------------------------------------------------------------------
// Classifier seam
// ---------------------------------------------------------------------------

/// The narrow interface the pipeline needs from a model.  Anything that can
/// be fitted on a labelled dataset and label a single passenger can be
/// trained, cross-validated and used for prediction.
pub trait Classifier: Sized {
    /// Fit a fresh model on every labelled row of `dataset`.
    fn fit(dataset: &Dataset) -> Result<Self>;

    /// Predicted label for one record.  The record's own label is ignored.
    fn classify(&self, passenger: &Passenger) -> Survival;

    fn classify_all(&self, passengers: &[Passenger]) -> Vec<Survival> {
        passengers.iter().map(|p| self.classify(p)).collect()
    }
}

// ---------------------------------------------------------------------------
// LogisticModel
// ---------------------------------------------------------------------------

/// Binary logistic regression fitted with `linfa-logistic` defaults.
///
/// Missing ages are replaced by the mean age of the training rows, which is
/// stored with the fitted parameters so predictions after a reload encode
/// records exactly as training did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    age_fill: f64,
    fitted: FittedLogisticRegression<f64, Survival>,
}

impl LogisticModel {
    pub fn intercept(&self) -> f64 {
        self.fitted.intercept()
    }

    /// One coefficient per encoded feature column.
    pub fn weights(&self) -> &Array1<f64> {
        self.fitted.params()
    }

    /// Value substituted for a missing age.
    pub fn age_fill(&self) -> f64 {
        self.age_fill
    }
}

impl Classifier for LogisticModel {
    fn fit(dataset: &Dataset) -> Result<Self> {
        let labelled = dataset.labelled();
        if labelled.is_empty() {
            return Err(TitanicError::Training(
                "dataset has no labelled rows".to_string(),
            ));
        }
        let skipped = dataset.len() - labelled.len();
        if skipped > 0 {
            log::warn!("skipping {skipped} rows with a missing label");
        }

        let counts = dataset.class_counts();
        if let Some(missing) = counts.iter().position(|&c| c == 0) {
            return Err(TitanicError::Training(format!(
                "only one class present, no rows labelled '{}'",
                Survival::VARIANTS[missing]
            )));
        }

        let age_fill = dataset.mean_age().unwrap_or(0.0);

        let records = encode(labelled.iter().map(|(p, _)| *p), age_fill);
        let targets: Array1<Survival> = labelled.iter().map(|(_, label)| *label).collect();
        let train = DatasetBase::new(records, targets);

        let fitted = LogisticRegression::<f64>::default()
            .fit(&train)
            .map_err(|e| TitanicError::Training(e.to_string()))?;

        if !fitted.intercept().is_finite() || fitted.params().iter().any(|w| !w.is_finite()) {
            return Err(TitanicError::Training(
                "optimiser did not converge to finite parameters".to_string(),
            ));
        }

        log::info!(
            "fitted logistic regression on {} rows (class counts {:?}), intercept {:.4}",
            labelled.len(),
            counts,
            fitted.intercept()
        );
        log::debug!("weights: {}", fitted.params());

        Ok(LogisticModel { age_fill, fitted })
    }

    fn classify(&self, passenger: &Passenger) -> Survival {
        let x = encode(std::iter::once(passenger), self.age_fill);
        let predicted: Array1<Survival> = self.fitted.predict(&x);
        predicted.into_iter().next().unwrap_or_default()
    }

    fn classify_all(&self, passengers: &[Passenger]) -> Vec<Survival> {
        if passengers.is_empty() {
            return Vec::new();
        }
        let x = encode(passengers.iter(), self.age_fill);
        let predicted: Array1<Survival> = self.fitted.predict(&x);
        predicted.to_vec()
    }
}

/// Design matrix for a set of records, one row each.
pub fn encode<'a>(passengers: impl Iterator<Item = &'a Passenger>, age_fill: f64) -> Array2<f64> {
    let rows: Vec<[f64; FEATURES]> = passengers
        .map(|p| {
            let mut row = [0.0; FEATURES];
            row[p.pclass.index()] = 1.0;
            row[AGE_COLUMN] = p.age.unwrap_or(age_fill);
            row[SEX_COLUMN] = p.sex.index() as f64;
            row
        })
        .collect();
    Array2::from_shape_fn((rows.len(), FEATURES), |(i, j)| rows[i][j])
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Leading bytes of every model file.
const MAGIC: &[u8; 4] = b"TLRM";

fn persistence_error(path: &Path, err: impl std::fmt::Display) -> TitanicError {
    TitanicError::Persistence(format!("{}: {err}", path.display()))
}

/// Serialize `model` to `path`, replacing any existing file.  Missing parent
/// directories are created.
pub fn save<M: Serialize>(model: &M, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| persistence_error(parent, e))?;
    }

    let file = File::create(path).map_err(|e| persistence_error(path, e))?;
    let mut out = BufWriter::new(file);
    out.write_all(MAGIC).map_err(|e| persistence_error(path, e))?;
    bincode::serialize_into(&mut out, model).map_err(|e| persistence_error(path, e))?;
    out.flush().map_err(|e| persistence_error(path, e))?;

    log::info!("saved model to {}", path.display());
    Ok(())
}

/// Read back a model written by [`save`].
pub fn load<M: DeserializeOwned>(path: &Path) -> Result<M> {
    let bytes = fs::read(path).map_err(|e| persistence_error(path, e))?;
    let payload = bytes
        .strip_prefix(MAGIC)
        .ok_or_else(|| persistence_error(path, "not a model file"))?;
    let model = bincode::deserialize(payload).map_err(|e| persistence_error(path, e))?;

    log::info!("loaded model from {}", path.display());
    Ok(model)
}
