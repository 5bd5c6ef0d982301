//! The four pipeline stages. Each takes the previous stage's artifact and its own
//! config, writes files only at the config's paths, and returns a new artifact.

pub mod ingestion;
pub mod model_trainer;
pub mod transformation;
pub mod validation;

pub use ingestion::DataIngestion;
pub use model_trainer::{CandidateResult, ModelTrainer};
pub use transformation::{DataTransformation, TransformedSplit};
pub use validation::DataValidation;
