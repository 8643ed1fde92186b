use crate::geometry::DetId;
use std::{io, path::PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClusterShapeError>;

#[derive(Debug, Error)]
pub enum ClusterShapeError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Failed to open calibration resource {path}")]
    OpenCalibration {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Calibration resource '{name}' not found (searched: {searched})")]
    CalibrationNotFound { name: String, searched: String },

    #[error("Invalid {field} in {origin}, record {record}: {value:?}")]
    CalibrationParse {
        origin: String,
        record: usize,
        field: &'static str,
        value: String,
    },

    #[error("Truncated record {record} in {origin}: missing {field}")]
    TruncatedRecord {
        origin: String,
        record: usize,
        field: &'static str,
    },

    #[error("Limits index {index} out of range (table size {size})")]
    KeyOutOfRange { index: usize, size: usize },

    #[error("No geometry for detector element {0}")]
    UnknownDetector(DetId),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for ClusterShapeError {
    fn from(err: toml::de::Error) -> Self {
        ClusterShapeError::Config(format!("TOML parse error: {}", err))
    }
}
