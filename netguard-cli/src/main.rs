//! `netguard`: run the training pipeline from the current directory.
//!
//! Settings come from `netguard.toml` and `NETGUARD_*` variables (a `.env` file is
//! honoured). The process exits non-zero with the pipeline error on any failure.

use netguard_ml::{PipelineConfig, TrainingPipeline, load_settings};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let workspace = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let settings = load_settings(Some(&workspace))?;
    let config = PipelineConfig::new(settings)?;

    // Human-readable stderr, overridable with RUST_LOG
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    // One JSON log file per run
    let log_dir = config.settings().log_dir.clone();
    std::fs::create_dir_all(&log_dir)?;
    let file_appender =
        tracing_appender::rolling::never(&log_dir, format!("{}.log", config.timestamp()));
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();
    tracing::debug!(
        workspace = %workspace.display(),
        log_dir = %log_dir.display(),
        "Settings loaded"
    );

    let pipeline = TrainingPipeline::new(config);
    let run = pipeline.run_with(|_, artifact| println!("{artifact}"))?;

    println!(
        "Run record: {} (model sha256 {})",
        pipeline.config().run_record_file_path().display(),
        run.model_sha256()
    );
    Ok(())
}
