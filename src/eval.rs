use std::fmt;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::{load_dataset, Dataset, Nominal, Passenger, Survival};
use crate::error::{Result, TitanicError};
use crate::model::{Classifier, LogisticModel};

// ---------------------------------------------------------------------------
// Confusion matrix
// ---------------------------------------------------------------------------

/// Counts indexed `[actual][predicted]` by label level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: [[u32; 2]; 2],
}

impl ConfusionMatrix {
    pub fn record(&mut self, actual: Survival, predicted: Survival) {
        self.counts[actual.index()][predicted.index()] += 1;
    }

    pub fn count(&self, actual: Survival, predicted: Survival) -> u32 {
        self.counts[actual.index()][predicted.index()]
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> u32 {
        Survival::VARIANTS.iter().map(|&c| self.count(c, c)).sum()
    }

    // condition positive, prediction positive
    pub fn true_positives(&self, positive: Survival) -> u32 {
        self.count(positive, positive)
    }

    // condition positive, prediction negative
    pub fn false_negatives(&self, positive: Survival) -> u32 {
        self.condition_positive(positive) - self.true_positives(positive)
    }

    // condition negative, prediction positive
    pub fn false_positives(&self, positive: Survival) -> u32 {
        self.prediction_positive(positive) - self.true_positives(positive)
    }

    // condition negative, prediction negative
    pub fn true_negatives(&self, positive: Survival) -> u32 {
        self.total()
            - self.true_positives(positive)
            - self.false_negatives(positive)
            - self.false_positives(positive)
    }

    pub fn condition_positive(&self, positive: Survival) -> u32 {
        self.counts[positive.index()].iter().sum()
    }

    pub fn prediction_positive(&self, positive: Survival) -> u32 {
        self.counts.iter().map(|row| row[positive.index()]).sum()
    }
}

// ---------------------------------------------------------------------------
// Evaluation report
// ---------------------------------------------------------------------------

/// Outcome of a cross-validation run.  Counts are reported for `positive`.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub folds: usize,
    pub seed: u64,
    pub positive: Survival,
    pub matrix: ConfusionMatrix,
}

impl EvaluationReport {
    /// Percent of rows classified correctly, `0..=100`.
    pub fn accuracy(&self) -> f64 {
        ratio(self.matrix.correct(), self.matrix.total()) * 100.0
    }

    pub fn true_positives(&self) -> u32 {
        self.matrix.true_positives(self.positive)
    }

    pub fn false_negatives(&self) -> u32 {
        self.matrix.false_negatives(self.positive)
    }

    pub fn false_positives(&self) -> u32 {
        self.matrix.false_positives(self.positive)
    }

    pub fn true_negatives(&self) -> u32 {
        self.matrix.true_negatives(self.positive)
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives(), self.matrix.prediction_positive(self.positive))
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives(), self.matrix.condition_positive(self.positive))
    }

    pub fn f_measure(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-fold cv (seed {}): accuracy {:.4}%, positive class '{}'",
            self.folds,
            self.seed,
            self.accuracy(),
            self.positive
        )
    }
}

fn ratio(num: u32, den: u32) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

// ---------------------------------------------------------------------------
// Cross-validation
// ---------------------------------------------------------------------------

/// k-fold cross-validation of a freshly fitted logistic regression on the
/// labelled rows of the file at `path`.
pub fn cross_validate(
    path: &Path,
    folds: usize,
    seed: u64,
    positive: Survival,
) -> Result<EvaluationReport> {
    let dataset = load_dataset(path)?;
    cross_validate_dataset::<LogisticModel>(&dataset, folds, seed, positive)
}

/// Cross-validate any [`Classifier`] on an in-memory dataset.
pub fn cross_validate_dataset<C: Classifier>(
    dataset: &Dataset,
    folds: usize,
    seed: u64,
    positive: Survival,
) -> Result<EvaluationReport> {
    let rows: Vec<(&Passenger, Survival)> = dataset.labelled();
    let assignment = fold_assignment(&rows, folds, seed)?;

    let mut matrix = ConfusionMatrix::default();
    for (fold, test) in assignment.iter().enumerate() {
        let mut in_test = vec![false; rows.len()];
        for &i in test {
            in_test[i] = true;
        }
        let train = Dataset::new(
            rows.iter()
                .zip(&in_test)
                .filter(|(_, t)| !**t)
                .map(|((p, _), _)| Passenger::clone(p))
                .collect(),
        );

        let model = C::fit(&train)?;
        let test_rows: Vec<Passenger> = test.iter().map(|&i| rows[i].0.clone()).collect();
        let predicted = model.classify_all(&test_rows);

        let before = matrix.correct();
        for (&i, label) in test.iter().zip(predicted) {
            matrix.record(rows[i].1, label);
        }
        log::debug!(
            "fold {fold}: trained on {}, {} of {} correct",
            train.len(),
            matrix.correct() - before,
            test.len()
        );
    }

    let report = EvaluationReport {
        folds,
        seed,
        positive,
        matrix,
    };
    log::info!("{report}");
    Ok(report)
}

/// Deterministic stratified fold assignment.
///
/// Indices are shuffled with a `StdRng` seeded by `seed`, grouped by class
/// (stable, so the shuffled order survives within each class), then dealt
/// out with stride `folds`.  Fold `f` is a contiguous chunk of that order:
/// `n / folds` rows, plus one for the first `n % folds` folds.
pub fn fold_assignment(
    rows: &[(&Passenger, Survival)],
    folds: usize,
    seed: u64,
) -> Result<Vec<Vec<usize>>> {
    let n = rows.len();
    if folds < 2 {
        return Err(TitanicError::Evaluation(format!(
            "need at least 2 folds, got {folds}"
        )));
    }
    if folds > n {
        return Err(TitanicError::Evaluation(format!(
            "{folds} folds requested but only {n} labelled rows available"
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    order.sort_by_key(|&i| rows[i].1);

    let mut dealt = Vec::with_capacity(n);
    for start in 0..folds {
        dealt.extend(order.iter().skip(start).step_by(folds).copied());
    }

    let base = n / folds;
    let extra = n % folds;
    let mut assignment = Vec::with_capacity(folds);
    let mut offset = 0;
    for fold in 0..folds {
        let size = base + usize::from(fold < extra);
        assignment.push(dealt[offset..offset + size].to_vec());
        offset += size;
    }
    Ok(assignment)
}
