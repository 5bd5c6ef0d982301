//! Ingestion: source CSV -> feature store copy -> shuffled train/test split.

use crate::artifact::DataIngestionArtifact;
use crate::config::DataIngestionConfig;
use crate::data::{CsvSource, DataBatch, DataSource, write_csv};
use crate::error::{PipelineError, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Rows routed to the test split: `ceil(ratio * n)`, kept below `n` so the
/// training split is never empty.
pub fn test_row_count(n_rows: usize, ratio: f64) -> usize {
    let raw = (ratio * n_rows as f64).ceil() as usize;
    raw.clamp(1, n_rows.saturating_sub(1).max(1))
}

pub struct DataIngestion {
    config: DataIngestionConfig,
}

impl DataIngestion {
    pub fn new(config: DataIngestionConfig) -> Result<Self> {
        let ratio = config.train_test_split_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(PipelineError::config(format!(
                "train_test_split_ratio must be in (0, 1), got {ratio}"
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &DataIngestionConfig {
        &self.config
    }

    /// Load the source and keep a copy of record in the feature store.
    pub fn export_data_into_feature_store(&self) -> Result<DataBatch> {
        let source = CsvSource::new(&self.config.source_csv_path);
        let info = source.source_info();
        let batch = source.load()?;
        tracing::info!(
            source = %info.location,
            rows = batch.row_count(),
            columns = batch.column_count(),
            "Loaded source data"
        );

        write_csv(&batch, &self.config.feature_store_file_path)?;
        tracing::debug!(
            path = %self.config.feature_store_file_path.display(),
            "Wrote feature store"
        );
        Ok(batch)
    }

    /// Shuffle the rows and split them into (train, test).
    pub fn split_data_as_train_test(&self, batch: &DataBatch) -> Result<(DataBatch, DataBatch)> {
        let n = batch.row_count();
        if n < 2 {
            return Err(PipelineError::data_source(format!(
                "source has {n} data rows, at least 2 are needed to split"
            )));
        }

        let mut rng = match self.config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut rng);

        let n_test = test_row_count(n, self.config.train_test_split_ratio);
        let (test_idx, train_idx) = order.split_at(n_test);
        Ok((batch.select_rows(train_idx), batch.select_rows(test_idx)))
    }

    pub fn initiate_data_ingestion(&self) -> Result<DataIngestionArtifact> {
        let batch = self.export_data_into_feature_store()?;
        let (train, test) = self.split_data_as_train_test(&batch)?;

        write_csv(&train, &self.config.training_file_path)?;
        write_csv(&test, &self.config.testing_file_path)?;
        tracing::info!(
            train_rows = train.row_count(),
            test_rows = test.row_count(),
            "Performed train/test split"
        );

        Ok(DataIngestionArtifact::new(
            self.config.training_file_path.clone(),
            self.config.testing_file_path.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PipelineConfig, PipelineSettings};
    use crate::persistence::is_non_empty_file;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn ingestion(dir: &TempDir, csv: &str, seed: Option<u64>) -> DataIngestion {
        let source = dir.path().join("source.csv");
        std::fs::write(&source, csv).unwrap();
        let settings = PipelineSettings {
            artifact_root: dir.path().join("Artifacts"),
            source_csv_path: source,
            random_seed: seed,
            ..PipelineSettings::default()
        };
        let pipeline = PipelineConfig::with_timestamp(settings, "run").unwrap();
        DataIngestion::new(DataIngestionConfig::new(&pipeline)).unwrap()
    }

    fn csv_with_rows(n: usize) -> String {
        let mut s = String::from("a,b,Result\n");
        for i in 0..n {
            s.push_str(&format!("{i},{},{}\n", i % 3, if i % 2 == 0 { 1 } else { -1 }));
        }
        s
    }

    #[test]
    fn test_row_count_rounds_up() {
        assert_eq!(test_row_count(10, 0.2), 2);
        assert_eq!(test_row_count(11, 0.2), 3);
        assert_eq!(test_row_count(2, 0.2), 1);
        assert_eq!(test_row_count(2, 0.9), 1);
    }

    #[test]
    fn test_writes_feature_store_and_splits() {
        let dir = TempDir::new().unwrap();
        let ing = ingestion(&dir, &csv_with_rows(25), Some(1));
        let artifact = ing.initiate_data_ingestion().unwrap();

        assert!(is_non_empty_file(&ing.config().feature_store_file_path));
        let train = CsvSource::new(artifact.trained_file_path()).load().unwrap();
        let test = CsvSource::new(artifact.test_file_path()).load().unwrap();
        assert_eq!(train.row_count(), 20);
        assert_eq!(test.row_count(), 5);
        assert_eq!(train.columns, vec!["a", "b", "Result"]);
    }

    #[test]
    fn test_seeded_split_is_reproducible() {
        let dir = TempDir::new().unwrap();
        let ing = ingestion(&dir, &csv_with_rows(30), Some(42));
        let batch = ing.export_data_into_feature_store().unwrap();
        let (a_train, a_test) = ing.split_data_as_train_test(&batch).unwrap();
        let (b_train, b_test) = ing.split_data_as_train_test(&batch).unwrap();
        assert_eq!(a_train, b_train);
        assert_eq!(a_test, b_test);
    }

    #[test]
    fn test_placeholders_survive_as_missing() {
        let dir = TempDir::new().unwrap();
        let ing = ingestion(&dir, "a,Result\nna,1\n2,-1\n3,1\n", Some(0));
        ing.initiate_data_ingestion().unwrap();
        let store = CsvSource::new(&ing.config().feature_store_file_path).load().unwrap();
        assert_eq!(store.rows[0], vec![json!(null), json!(1)]);
    }

    #[test]
    fn test_too_few_rows() {
        let dir = TempDir::new().unwrap();
        let ing = ingestion(&dir, "a,Result\n1,1\n", None);
        let err = ing.initiate_data_ingestion().unwrap_err();
        assert!(matches!(err.kind(), crate::ErrorKind::DataSource(_)));
    }

    #[test]
    fn test_missing_source_is_data_source_error() {
        let dir = TempDir::new().unwrap();
        let ing = ingestion(&dir, "a\n", None);
        std::fs::remove_file(&ing.config().source_csv_path).unwrap();
        let err = ing.initiate_data_ingestion().unwrap_err();
        assert!(matches!(err.kind(), crate::ErrorKind::DataSource(_)));
    }
}
