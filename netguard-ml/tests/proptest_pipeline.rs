//! Property-based tests for the split and the imputer using proptest.

use ndarray::Array2;
use netguard_ml::components::DataIngestion;
use netguard_ml::components::ingestion::test_row_count;
use netguard_ml::data::{CsvSource, DataSource};
use netguard_ml::preprocessing::KnnImputer;
use netguard_ml::{DataIngestionConfig, PipelineConfig, PipelineSettings};
use proptest::prelude::*;
use tempfile::TempDir;

// --- Split sizes ---

proptest! {
    #[test]
    fn split_count_is_ceil_of_ratio(n in 2usize..5000, ratio in 0.01f64..0.99) {
        let k = test_row_count(n, ratio);
        prop_assert!(k >= 1 && k < n);
        let expected = ((ratio * n as f64).ceil() as usize).min(n - 1);
        prop_assert_eq!(k, expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn split_files_partition_the_source(
        n in 2usize..120,
        ratio in 0.05f64..0.95,
        seed in any::<u64>(),
    ) {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("data.csv");
        let mut csv = String::from("id,Result\n");
        for i in 0..n {
            csv.push_str(&format!("{i},{}\n", if i % 2 == 0 { 1 } else { -1 }));
        }
        std::fs::write(&source, csv).unwrap();

        let settings = PipelineSettings {
            artifact_root: dir.path().join("Artifacts"),
            source_csv_path: source,
            train_test_split_ratio: ratio,
            random_seed: Some(seed),
            ..PipelineSettings::default()
        };
        let config = PipelineConfig::with_timestamp(settings, "prop").unwrap();
        let artifact = DataIngestion::new(DataIngestionConfig::new(&config))
            .unwrap()
            .initiate_data_ingestion()
            .unwrap();

        let train = CsvSource::new(artifact.trained_file_path()).load().unwrap();
        let test = CsvSource::new(artifact.test_file_path()).load().unwrap();
        prop_assert_eq!(train.row_count() + test.row_count(), n);
        prop_assert_eq!(test.row_count(), test_row_count(n, ratio));

        let mut ids: Vec<i64> = train
            .rows
            .iter()
            .chain(test.rows.iter())
            .map(|row| row[0].as_i64().unwrap())
            .collect();
        ids.sort_unstable();
        prop_assert_eq!(ids, (0..n as i64).collect::<Vec<_>>());
    }
}

// --- Imputation ---

proptest! {
    #[test]
    fn imputer_fills_every_gap_and_keeps_observed_cells(
        cells in prop::collection::vec(prop::option::weighted(0.8, -100.0f64..100.0), 12..60),
        k in 1usize..6,
    ) {
        let rows = cells.len() / 3;
        let values: Vec<f64> = cells[..rows * 3]
            .iter()
            .map(|c| c.unwrap_or(f64::NAN))
            .collect();
        let x = Array2::from_shape_vec((rows, 3), values).unwrap();

        let (_, imputed) = KnnImputer::new(k).fit_transform(&x).unwrap();
        for (orig, out) in x.iter().zip(imputed.iter()) {
            prop_assert!(!out.is_nan());
            if !orig.is_nan() {
                prop_assert_eq!(orig, out);
            }
        }
    }
}
