//! Console reporting.  Every block is framed by [`SEPARATOR`] lines; the
//! writers take any `io::Write` so the pipeline prints to stdout and tests
//! print to a buffer.

use std::io::{self, Write};

use crate::data::{Passenger, Survival};
use crate::eval::EvaluationReport;

pub const SEPARATOR: &str = "-------------------------------";

/// `<record> : <label>` for each prediction.  Returns the number of rows
/// written.
pub fn write_predictions<W, I>(out: &mut W, predictions: I) -> io::Result<usize>
where
    W: Write,
    I: IntoIterator<Item = (Passenger, Survival)>,
{
    writeln!(out, "{SEPARATOR}")?;
    let mut rows = 0;
    for (passenger, label) in predictions {
        writeln!(out, "{passenger} : {label}")?;
        rows += 1;
    }
    writeln!(out, "{SEPARATOR}")?;
    Ok(rows)
}

pub fn write_single<W: Write>(out: &mut W, passenger: &Passenger, label: Survival) -> io::Result<()> {
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "{passenger} : {label}")?;
    writeln!(out, "{SEPARATOR}")
}

/// Accuracy, then the confusion matrix for the positive class as
/// `TP FN` / `FP TN`, tab separated.
pub fn write_evaluation<W: Write>(out: &mut W, report: &EvaluationReport) -> io::Result<()> {
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "Accuracy: {}", report.accuracy())?;
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "Confusion Matrix")?;
    writeln!(out, "{}\t{}", report.true_positives(), report.false_negatives())?;
    writeln!(out, "{}\t{}", report.false_positives(), report.true_negatives())?;
    writeln!(out, "{SEPARATOR}")?;
    writeln!(
        out,
        "Precision: {:.4}  Recall: {:.4}  F-Measure: {:.4}  (class {})",
        report.precision(),
        report.recall(),
        report.f_measure(),
        report.positive
    )?;
    writeln!(out, "{SEPARATOR}")
}
