use std::fs;
use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use tempfile::TempDir;

use titanic_predictor::data::writer::write_dataset;
use titanic_predictor::data::{load_dataset, Dataset, Nominal, Passenger, Pclass, Sex, Survival};
use titanic_predictor::eval::cross_validate;
use titanic_predictor::predict::{predict, predict_one};
use titanic_predictor::{model, train, Classifier, LogisticModel, TitanicError};

/// Deterministic labelled table: women and first class mostly survive, with
/// enough exceptions that the classes are not separable.
fn passengers(n: usize) -> Vec<Passenger> {
    (0..n)
        .map(|i| {
            let pclass = Pclass::VARIANTS[(i * 7 + i / 5) % 3];
            let sex = Sex::VARIANTS[usize::from(i % 5 < 2)];
            let age = if i % 13 == 0 {
                None
            } else {
                Some(2.0 + ((i * 17) % 70) as f64)
            };
            let survived = match (sex, pclass) {
                (Sex::Female, Pclass::Third) => i % 3 == 0,
                (Sex::Female, _) => i % 9 != 0,
                (Sex::Male, Pclass::First) => i % 2 == 0,
                (Sex::Male, _) => i % 7 == 0,
            };
            Passenger {
                pclass,
                age,
                sex,
                survived: Some(Survival::VARIANTS[usize::from(survived)]),
            }
        })
        .collect()
}

fn fixture(dir: &TempDir, name: &str, dataset: &Dataset) -> PathBuf {
    let path = dir.path().join(name);
    write_dataset(dataset, &path).unwrap();
    path
}

fn training_file(dir: &TempDir) -> PathBuf {
    fixture(dir, "titanic.train.arff", &Dataset::new(passengers(120)))
}

#[test]
fn saved_model_classifies_training_rows_like_the_fitted_one() {
    let dir = tempfile::tempdir().unwrap();
    let train_path = training_file(&dir);
    let model_path = dir.path().join("model").join("titanic.model");

    let trained = train(&train_path).unwrap();
    model::save(&trained, &model_path).unwrap();
    let loaded: LogisticModel = model::load(&model_path).unwrap();

    let dataset = load_dataset(&train_path).unwrap();
    for p in dataset.iter() {
        assert_eq!(trained.classify(p), loaded.classify(p), "{p}");
    }
}

#[test]
fn save_overwrites_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let train_path = training_file(&dir);
    let model_path = dir.path().join("titanic.model");
    fs::write(&model_path, vec![0u8; 4096]).unwrap();

    let trained = train(&train_path).unwrap();
    model::save(&trained, &model_path).unwrap();
    let loaded: LogisticModel = model::load(&model_path).unwrap();
    assert_eq!(loaded.weights(), trained.weights());
}

#[test]
fn cross_validation_is_deterministic_under_fixed_seed() {
    let dir = tempfile::tempdir().unwrap();
    let path = training_file(&dir);

    let a = cross_validate(&path, 10, 1, Survival::Died).unwrap();
    let b = cross_validate(&path, 10, 1, Survival::Died).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.accuracy().to_bits(), b.accuracy().to_bits());
}

#[test]
fn confusion_matrix_accounts_for_every_row() {
    let dir = tempfile::tempdir().unwrap();
    let mut rows = passengers(97);
    rows[3].survived = None;
    let path = fixture(&dir, "partly.arff", &Dataset::new(rows));

    for positive in Survival::VARIANTS {
        let report = cross_validate(&path, 10, 7, *positive).unwrap();
        let total = report.true_positives()
            + report.false_negatives()
            + report.false_positives()
            + report.true_negatives();
        assert_eq!(total, 96);
        assert_relative_eq!(
            report.accuracy(),
            100.0 * (report.true_positives() + report.true_negatives()) as f64 / total as f64,
            epsilon = 1e-9
        );
    }
}

#[test]
fn invalid_fold_counts_are_evaluation_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "small.csv", &Dataset::new(passengers(6)));

    assert!(matches!(
        cross_validate(&path, 7, 1, Survival::Died),
        Err(TitanicError::Evaluation(_))
    ));
    assert!(matches!(
        cross_validate(&path, 1, 1, Survival::Died),
        Err(TitanicError::Evaluation(_))
    ));
}

#[test]
fn single_record_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let model = train(&training_file(&dir)).unwrap();

    let label = predict_one(&model, "1", 5.0, "female").unwrap();
    assert!(["0", "1"].contains(&label.level()));

    assert!(matches!(
        predict_one(&model, "9", 5.0, "female"),
        Err(TitanicError::SchemaMismatch { .. })
    ));
    assert!(matches!(
        predict_one(&model, "1", 5.0, "unknown"),
        Err(TitanicError::SchemaMismatch { .. })
    ));
}

#[test]
fn batch_prediction_keeps_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let model = train(&training_file(&dir)).unwrap();

    let mut test_rows = passengers(15);
    for p in &mut test_rows {
        p.survived = None;
    }
    let test_path = fixture(&dir, "titanic.test.arff", &Dataset::new(test_rows.clone()));

    let out: Vec<(Passenger, Survival)> = predict(&model, &test_path).unwrap().collect();
    assert_eq!(out.len(), test_rows.len());
    for ((p, label), expected) in out.iter().zip(&test_rows) {
        assert_eq!(p, expected);
        assert_eq!(*label, model.classify(expected));
    }

    // a second call restarts from the top
    assert_eq!(predict(&model, &test_path).unwrap().count(), 15);
}

#[test]
fn empty_test_file_yields_no_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let model = train(&training_file(&dir)).unwrap();
    let empty = fixture(&dir, "empty.arff", &Dataset::default());

    assert_eq!(predict(&model, &empty).unwrap().count(), 0);
}

#[test]
fn all_formats_load_the_same_records() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = Dataset::new(passengers(40));

    let arff = load_dataset(&fixture(&dir, "t.arff", &dataset)).unwrap();
    let csv = load_dataset(&fixture(&dir, "t.csv", &dataset)).unwrap();
    let parquet = load_dataset(&fixture(&dir, "t.parquet", &dataset)).unwrap();

    let json_path = dir.path().join("t.json");
    fs::write(&json_path, serde_json::to_string(&dataset.passengers).unwrap()).unwrap();
    let json = load_dataset(&json_path).unwrap();

    assert_eq!(arff.passengers, dataset.passengers);
    assert_eq!(csv.passengers, dataset.passengers);
    assert_eq!(parquet.passengers, dataset.passengers);
    assert_eq!(json.passengers, dataset.passengers);
}

#[test]
fn training_failures() {
    let dir = tempfile::tempdir().unwrap();

    let mut one_class = passengers(30);
    for p in &mut one_class {
        p.survived = Some(Survival::Survived);
    }
    let path = fixture(&dir, "one_class.arff", &Dataset::new(one_class));
    assert!(matches!(train(&path), Err(TitanicError::Training(_))));

    let path = fixture(&dir, "empty.arff", &Dataset::default());
    assert!(matches!(train(&path), Err(TitanicError::Training(_))));

    assert!(matches!(
        train(Path::new("no/such/file.arff")),
        Err(TitanicError::DataFormat(_))
    ));
}

#[test]
fn schema_violations_are_data_format_errors() {
    let dir = tempfile::tempdir().unwrap();

    let path = dir.path().join("bad_header.csv");
    fs::write(&path, "class,age,sex,survived\n1,22,male,0\n").unwrap();
    assert!(matches!(load_dataset(&path), Err(TitanicError::DataFormat(_))));

    let path = dir.path().join("bad_level.csv");
    fs::write(&path, "pclass,age,sex,survived\n1,22,robot,0\n").unwrap();
    assert!(matches!(load_dataset(&path), Err(TitanicError::DataFormat(_))));

    let path = dir.path().join("bad_age.json");
    fs::write(&path, r#"[{"pclass": 1, "age": "old", "sex": "male"}]"#).unwrap();
    assert!(matches!(load_dataset(&path), Err(TitanicError::DataFormat(_))));
}
