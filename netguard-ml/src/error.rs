//! Error types for the netguard-ml crate.
//!
//! Every failure is a [`PipelineError`]: an [`ErrorKind`] plus the source location
//! where it was raised (captured through `#[track_caller]`, so a `?` on an io or
//! serde error records the line of the `?`). The orchestrator adds the stage name
//! on the way out; nothing else rewrites an error once it exists.

use crate::pipeline::StageName;
use std::fmt;
use std::panic::Location;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// What went wrong.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Schema validation error: {0}")]
    SchemaValidation(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error(
        "Model is overfitting or underfitting: train {metric} {train_score:.4} and test {metric} \
         {test_score:.4} differ by {difference:.4}, threshold is {threshold}"
    )]
    OverfitUnderfit {
        metric: String,
        train_score: f64,
        test_score: f64,
        difference: f64,
        threshold: f64,
    },

    #[error("Insufficient accuracy: test {metric} {score:.4} is below the expected {expected}")]
    InsufficientAccuracy {
        metric: String,
        score: f64,
        expected: f64,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// The single error type returned by every stage.
#[derive(Debug)]
pub struct PipelineError {
    kind: ErrorKind,
    location: &'static Location<'static>,
    stage: Option<StageName>,
}

impl PipelineError {
    #[track_caller]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: Location::caller(),
            stage: None,
        }
    }

    #[track_caller]
    pub fn data_source(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::DataSource(msg.into()))
    }

    #[track_caller]
    pub fn schema_validation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaValidation(msg.into()))
    }

    #[track_caller]
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidData(msg.into()))
    }

    #[track_caller]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config(msg.into()))
    }

    #[track_caller]
    pub fn training(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Training(msg.into()))
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Source file the error was raised in.
    pub fn file(&self) -> &'static str {
        self.location.file()
    }

    pub fn line(&self) -> u32 {
        self.location.line()
    }

    pub fn stage(&self) -> Option<StageName> {
        self.stage
    }

    /// Tag the error with the stage it escaped from. The first tag wins.
    pub fn in_stage(mut self, stage: StageName) -> Self {
        self.stage.get_or_insert(stage);
        self
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(stage) = self.stage {
            write!(f, "[{stage}] ")?;
        }
        write!(
            f,
            "error occurred in [{}] line number [{}] error message [{}]",
            self.file(),
            self.line(),
            self.kind
        )
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl From<ErrorKind> for PipelineError {
    #[track_caller]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<std::io::Error> for PipelineError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io(err))
    }
}

impl From<csv::Error> for PipelineError {
    #[track_caller]
    fn from(err: csv::Error) -> Self {
        Self::new(ErrorKind::Csv(err))
    }
}

impl From<serde_json::Error> for PipelineError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::Json(err))
    }
}

impl From<serde_yaml::Error> for PipelineError {
    #[track_caller]
    fn from(err: serde_yaml::Error) -> Self {
        Self::new(ErrorKind::Yaml(err))
    }
}
