use std::path::PathBuf;

use thiserror::Error;

/// Invalid orchestrator arguments. Raised before any task is scheduled.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid orchestrator configuration: {0}")]
    Configuration(String),
}

/// The creator list could not be loaded.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("input file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("unsupported input format \"{extension}\" for {}; expected csv, xlsx, xls or ods", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("failed to read {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("column \"{column}\" not found in {}", path.display())]
    MissingColumn { path: PathBuf, column: String },
}

/// The report could not be written. The in-memory report is unaffected.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write report {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
