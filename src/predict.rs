use std::path::Path;

use crate::data::{load_dataset, Nominal, Passenger, Pclass, Sex, Survival};
use crate::error::{Result, TitanicError};
use crate::model::Classifier;

/// Lazy `(record, predicted label)` sequence over a loaded test file, in
/// file order.  Each record is classified when it is pulled.
pub struct Predictions<'m, C> {
    model: &'m C,
    rows: std::vec::IntoIter<Passenger>,
}

impl<C: Classifier> Iterator for Predictions<'_, C> {
    type Item = (Passenger, Survival);

    fn next(&mut self) -> Option<Self::Item> {
        let passenger = self.rows.next()?;
        let label = self.model.classify(&passenger);
        Some((passenger, label))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl<C: Classifier> ExactSizeIterator for Predictions<'_, C> {}

/// Classify every row of the dataset at `path`.  Labels present in the file
/// are carried along in the returned records but play no part in the
/// prediction.
pub fn predict<'m, C: Classifier>(model: &'m C, path: &Path) -> Result<Predictions<'m, C>> {
    let dataset = load_dataset(path)?;
    Ok(Predictions {
        model,
        rows: dataset.into_iter(),
    })
}

/// Classify one hand-built record.  `pclass` and `sex` must be declared
/// levels of the schema, otherwise the call fails with a schema mismatch.
pub fn predict_one<C: Classifier>(model: &C, pclass: &str, age: f64, sex: &str) -> Result<Survival> {
    let passenger = single_record(pclass, age, sex)?;
    Ok(model.classify(&passenger))
}

/// The unlabelled in-memory record [`predict_one`] classifies.
pub fn single_record(pclass: &str, age: f64, sex: &str) -> Result<Passenger> {
    if !age.is_finite() {
        return Err(TitanicError::data(format!("age {age} is not finite")));
    }
    Ok(Passenger::unlabelled(
        Pclass::parse_level(pclass)?,
        Some(age),
        Sex::parse_level(sex)?,
    ))
}
