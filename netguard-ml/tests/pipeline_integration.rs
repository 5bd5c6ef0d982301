//! End-to-end tests of the training pipeline against temporary artifact roots.
//!
//! Data is synthetic and seeded, so every run here is deterministic.

use ndarray::{Array1, Array2};
use netguard_ml::algorithms::ModelSpec;
use netguard_ml::components::{ModelTrainer, TransformedSplit};
use netguard_ml::data::{CsvSource, DataSource};
use netguard_ml::persistence::{atomic_write_json, hash_file, is_non_empty_file, load_json};
use netguard_ml::preprocessing::{KnnImputer, Preprocessor};
use netguard_ml::{
    DataTransformationArtifact, ErrorKind, ModelTrainerConfig, NetworkModel, PipelineConfig,
    PipelineRun, PipelineSettings, StageName, TrainingPipeline,
};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SCHEMA: &str = "\
columns:
  - f1: int64
  - f2: int64
  - f3: int64
  - Result: int64
numerical_columns:
  - f1
  - f2
  - f3
  - Result
";

/// 200 rows; the label is 1 exactly when f1 >= 0 (-1 otherwise), f3 is noise
/// with a missing value every tenth row.
fn synthetic_csv() -> String {
    let mut csv = String::from("f1,f2,f3,Result\n");
    for i in 0..200 {
        let f1 = (i % 3) as i64 - 1;
        let f2 = ((i / 3) % 3) as i64 - 1;
        let f3 = if i % 10 == 3 {
            "na".to_string()
        } else {
            ((i * 7) % 5).to_string()
        };
        let label = if f1 >= 0 { 1 } else { -1 };
        csv.push_str(&format!("{f1},{f2},{f3},{label}\n"));
    }
    csv
}

fn settings(dir: &Path, csv: &str) -> PipelineSettings {
    let source = dir.join("NetworkData").join("data.csv");
    std::fs::create_dir_all(source.parent().unwrap()).unwrap();
    std::fs::write(&source, csv).unwrap();
    let schema = dir.join("schema.yaml");
    std::fs::write(&schema, SCHEMA).unwrap();

    PipelineSettings {
        artifact_root: dir.join("Artifacts"),
        saved_model_dir: dir.join("saved_models"),
        source_csv_path: source,
        schema_path: schema,
        random_seed: Some(7),
        candidates: vec![
            ModelSpec::DecisionTree {
                max_depth: Some(4),
                min_samples_split: 2,
            },
            ModelSpec::LogisticRegression {
                learning_rate: 0.1,
                max_iter: 500,
                alpha: 0.0,
            },
        ],
        ..PipelineSettings::default()
    }
}

fn pipeline(dir: &Path, csv: &str) -> TrainingPipeline {
    let config =
        PipelineConfig::with_timestamp(settings(dir, csv), "01_01_2026_00_00_00").unwrap();
    TrainingPipeline::new(config)
}

#[test]
fn test_end_to_end_run_produces_all_artifacts() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(dir.path(), &synthetic_csv());
    let run = pipeline.run().unwrap();

    let run_dir = dir.path().join("Artifacts").join("01_01_2026_00_00_00");
    for rel in [
        "data_ingestion/feature_store/data.csv",
        "data_ingestion/ingested/train.csv",
        "data_ingestion/ingested/test.csv",
        "data_validation/validated/train.csv",
        "data_validation/validated/test.csv",
        "data_validation/drift_report/report.yaml",
        "data_transformation/transformed/train.json",
        "data_transformation/transformed/test.json",
        "data_transformation/transformed_object/preprocessing.json",
        "model_trainer/trained_model/model.json",
        "pipeline_run.json",
    ] {
        assert!(is_non_empty_file(&run_dir.join(rel)), "missing {rel}");
    }
    assert!(!run_dir.join("data_validation/invalid").exists());

    let trainer = run.model_trainer();
    assert_eq!(trainer.model_name(), "decision_tree");
    assert_eq!(trainer.test_metric().f1_score, 1.0);
    assert!(is_non_empty_file(trainer.saved_model_file_path()));
    assert_eq!(
        std::fs::read(trainer.trained_model_file_path()).unwrap(),
        std::fs::read(trainer.saved_model_file_path()).unwrap()
    );

    let record: PipelineRun = load_json(&pipeline.config().run_record_file_path()).unwrap();
    assert_eq!(record.timestamp(), "01_01_2026_00_00_00");
    assert_eq!(record.model_sha256(), hash_file(trainer.trained_model_file_path()).unwrap());
    assert_eq!(record.data_ingestion(), run.data_ingestion());
}

#[test]
fn test_saved_model_predicts_raw_rows() {
    let dir = TempDir::new().unwrap();
    let run = pipeline(dir.path(), &synthetic_csv()).run().unwrap();

    let model = NetworkModel::load(run.model_trainer().saved_model_file_path()).unwrap();
    let rows = Array2::from_shape_vec(
        (3, 3),
        vec![1.0, 0.0, f64::NAN, -1.0, 1.0, 2.0, 0.0, -1.0, 4.0],
    )
    .unwrap();
    assert_eq!(model.predict(&rows).unwrap(), Array1::from(vec![1.0, 0.0, 1.0]));
}

#[test]
fn test_rerun_of_ingestion_overwrites_outputs() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(dir.path(), &synthetic_csv());

    let first = pipeline.start_data_ingestion().unwrap();
    let first_train = std::fs::read_to_string(first.trained_file_path()).unwrap();
    let second = pipeline.start_data_ingestion().unwrap();
    assert_eq!(first, second);

    assert_eq!(std::fs::read_to_string(second.trained_file_path()).unwrap(), first_train);
    let train = CsvSource::new(second.trained_file_path()).load().unwrap();
    let test = CsvSource::new(second.test_file_path()).load().unwrap();
    assert_eq!(train.row_count() + test.row_count(), 200);
    assert_eq!(test.row_count(), 40);
}

#[test]
fn test_missing_column_stops_at_validation() {
    let dir = TempDir::new().unwrap();
    let csv: String = synthetic_csv()
        .lines()
        .map(|line| {
            let mut cells: Vec<&str> = line.split(',').collect();
            cells.remove(1);
            cells.join(",") + "\n"
        })
        .collect();

    let pipeline = pipeline(dir.path(), &csv);
    let err = pipeline.run().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::SchemaValidation(_)));
    assert_eq!(err.stage(), Some(StageName::Validation));
    assert!(err.to_string().starts_with("[data_validation] error occurred in ["));
    assert!(!pipeline.config().artifact_dir().join("data_transformation").exists());
}

#[test]
fn test_non_numeric_content_stops_the_run() {
    let dir = TempDir::new().unwrap();
    let csv = synthetic_csv().replacen("\n0,", "\nzero,", 1);

    let pipeline = pipeline(dir.path(), &csv);
    let err = pipeline.run().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidData(_)));
    assert_eq!(err.stage(), Some(StageName::Validation));

    let run_dir = pipeline.config().artifact_dir();
    assert!(run_dir.join("data_validation/invalid/train.csv").exists());
    assert!(!run_dir.join("data_validation/validated").exists());
    assert!(!run_dir.join("data_transformation").exists());
}

#[test]
fn test_nan_spellings_run_through_as_missing_values() {
    let dir = TempDir::new().unwrap();
    let csv = synthetic_csv()
        .replacen(",na,", ",NaN,", 1)
        .replacen(",na,", ",NA,", 1)
        .replacen(",na,", ",null,", 1);
    assert!(csv.contains(",NaN,") && csv.contains(",null,"));

    let pipeline = pipeline(dir.path(), &csv);
    let run = pipeline.run().unwrap();
    assert!(run.data_validation().is_valid());

    let train = CsvSource::new(run.data_ingestion().trained_file_path()).load().unwrap();
    let test = CsvSource::new(run.data_ingestion().test_file_path()).load().unwrap();
    let missing = train
        .rows
        .iter()
        .chain(test.rows.iter())
        .filter(|row| row[2].is_null())
        .count();
    assert_eq!(missing, 20);
    assert!(is_non_empty_file(run.model_trainer().saved_model_file_path()));
}

#[test]
fn test_finished_stages_are_reported_before_a_failure() {
    let dir = TempDir::new().unwrap();
    let csv = synthetic_csv().replacen("\n0,", "\nzero,", 1);
    let pipeline = pipeline(dir.path(), &csv);

    let mut reported = Vec::new();
    let err = pipeline
        .run_with(|stage, artifact| reported.push((stage, artifact.to_string())))
        .unwrap_err();
    assert_eq!(err.stage(), Some(StageName::Validation));
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].0, StageName::Ingestion);
    assert!(reported[0].1.contains("train.csv"));
}

#[test]
fn test_imputer_is_fit_on_training_rows_only() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(dir.path(), &synthetic_csv());
    let ingestion = pipeline.start_data_ingestion().unwrap();
    let validation = pipeline.start_data_validation(&ingestion).unwrap();
    let transformation = pipeline.start_data_transformation(&validation).unwrap();

    let preprocessor: Preprocessor =
        load_json(transformation.transformed_object_file_path()).unwrap();
    let columns: Vec<String> = preprocessor.feature_columns().to_vec();
    let train = CsvSource::new(ingestion.trained_file_path())
        .load()
        .unwrap()
        .to_matrix(&columns)
        .unwrap();

    let reference = preprocessor.imputer().reference();
    assert_eq!(reference.dim(), train.dim());
    for (a, b) in reference.iter().zip(train.iter()) {
        assert!(a == b || (a.is_nan() && b.is_nan()));
    }

    for (c, mean) in preprocessor.imputer().column_means().iter().enumerate() {
        let observed: Vec<f64> =
            train.column(c).iter().copied().filter(|v| !v.is_nan()).collect();
        let expected = observed.iter().sum::<f64>() / observed.len() as f64;
        assert!((mean - expected).abs() < 1e-12);
    }
}

/// A trainer over hand-built transformed arrays, with a single decision stump
/// on feature `x`.
fn stump_trainer(
    dir: &Path,
    test_x: &[f64],
    test_y: &[f64],
) -> (ModelTrainer, ModelTrainerConfig) {
    let settings = PipelineSettings {
        artifact_root: dir.join("Artifacts"),
        saved_model_dir: dir.join("saved_models"),
        random_seed: Some(0),
        candidates: vec![ModelSpec::DecisionTree {
            max_depth: Some(1),
            min_samples_split: 2,
        }],
        ..PipelineSettings::default()
    };
    let config = PipelineConfig::with_timestamp(settings, "gates").unwrap();

    // x = 0..100, positive from 50 on, plus one mislabelled row at x = 10.
    let train_x = Array2::from_shape_fn((100, 1), |(i, _)| i as f64);
    let mut train_y = Array1::from_shape_fn(100, |i| if i >= 50 { 1.0 } else { 0.0 });
    train_y[10] = 1.0;

    let base: PathBuf = dir.join("transformed");
    let (train_path, test_path, object_path) = (
        base.join("train.json"),
        base.join("test.json"),
        base.join("preprocessing.json"),
    );
    let (preprocessor, train_x) =
        Preprocessor::fit_transform(vec!["x".into()], KnnImputer::new(3), &train_x).unwrap();
    TransformedSplit::new(vec!["x".into()], "Result", &train_x, &train_y)
        .unwrap()
        .save(&train_path)
        .unwrap();
    let test_x = Array2::from_shape_vec((test_x.len(), 1), test_x.to_vec()).unwrap();
    TransformedSplit::new(vec!["x".into()], "Result", &test_x, &Array1::from(test_y.to_vec()))
        .unwrap()
        .save(&test_path)
        .unwrap();
    atomic_write_json(&object_path, &preprocessor).unwrap();

    let trainer_config = ModelTrainerConfig::new(&config);
    let trainer = ModelTrainer::new(
        DataTransformationArtifact::new(object_path, train_path, test_path),
        trainer_config.clone(),
    );
    (trainer, trainer_config)
}

#[test]
fn test_gates_accept_close_scores_and_persist_model() {
    let dir = TempDir::new().unwrap();
    // Positive from 50 on, except x = 95.
    let test_x: Vec<f64> = (1..=20).map(|i| (i * 5) as f64).collect();
    let test_y: Vec<f64> = test_x
        .iter()
        .map(|&x| if x >= 50.0 && x != 95.0 { 1.0 } else { 0.0 })
        .collect();
    let (trainer, config) = stump_trainer(dir.path(), &test_x, &test_y);

    let artifact = trainer.initiate_model_trainer().unwrap();
    assert!((artifact.train_metric().f1_score - 100.0 / 101.0).abs() < 1e-9);
    assert!((artifact.test_metric().f1_score - 20.0 / 21.0).abs() < 1e-9);
    assert!(is_non_empty_file(&config.trained_model_file_path));
    assert!(is_non_empty_file(&config.saved_model_file_path));
}

#[test]
fn test_low_test_score_writes_no_model() {
    let dir = TempDir::new().unwrap();
    let test_x = [60.0, 70.0, 80.0, 90.0, 100.0, 10.0, 20.0, 30.0];
    let test_y = [1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
    let (trainer, config) = stump_trainer(dir.path(), &test_x, &test_y);

    let err = trainer.initiate_model_trainer().unwrap_err();
    match err.kind() {
        ErrorKind::InsufficientAccuracy { score, expected, .. } => {
            assert!((score - 0.4).abs() < 1e-9);
            assert_eq!(*expected, 0.6);
        }
        other => panic!("expected InsufficientAccuracy, got {other:?}"),
    }
    assert!(!config.trained_model_file_path.exists());
    assert!(!config.saved_model_file_path.exists());
}

#[test]
fn test_train_test_gap_writes_no_model() {
    let dir = TempDir::new().unwrap();
    // The stump misses x = 10 only: test F1 8/9 against train F1 100/101.
    let test_x = [60.0, 70.0, 80.0, 90.0, 10.0, 20.0];
    let test_y = [1.0, 1.0, 1.0, 1.0, 1.0, 0.0];
    let (trainer, config) = stump_trainer(dir.path(), &test_x, &test_y);

    let err = trainer.initiate_model_trainer().unwrap_err();
    match err.kind() {
        ErrorKind::OverfitUnderfit {
            train_score,
            test_score,
            difference,
            threshold,
            ..
        } => {
            assert!((train_score - 100.0 / 101.0).abs() < 1e-9);
            assert!((test_score - 8.0 / 9.0).abs() < 1e-9);
            assert!(difference > threshold);
        }
        other => panic!("expected OverfitUnderfit, got {other:?}"),
    }
    assert!(!config.trained_model_file_path.exists());
    assert!(!config.saved_model_file_path.exists());
}
