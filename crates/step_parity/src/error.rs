use std::{io, path::PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParityError>;

#[derive(Debug, Error)]
pub enum ParityError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid CSV Header: {0}")]
    CsvHeader(String),

    #[error("Invalid CSV row {row}: expected at least {expected} columns, got {got}")]
    CsvRow {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("Unknown note type at row {row}: {label}")]
    UnknownNoteType { row: usize, label: String },

    #[error("Invalid {field} at row {row}: {value}")]
    NumberParse {
        row: usize,
        field: &'static str,
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    #[error("Invalid column at row {row}: {value}")]
    ColumnParse {
        row: usize,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("Failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write file {path}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unknown stage layout: {0}")]
    UnknownLayout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<toml::de::Error> for ParityError {
    fn from(err: toml::de::Error) -> Self {
        ParityError::Config(format!("TOML parse error: {}", err))
    }
}
