use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the attendance pipeline.
#[derive(Error, Debug)]
pub enum AttendanceError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source dataset does not exist.
    #[error("Input dataset not found: {0}")]
    MissingInput(PathBuf),

    /// The dataset header lacks a required column.
    #[error("Missing required column {column} in {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// The dataset has an extension no reader handles.
    #[error("Unsupported dataset format: {0}")]
    UnsupportedFormat(PathBuf),

    /// A CSV document could not be read or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A spreadsheet could not be opened or its first sheet read.
    #[error("Failed to read workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// An output table could not be written.
    #[error("Failed to export {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the attendance crates.
pub type Result<T> = std::result::Result<T, AttendanceError>;
