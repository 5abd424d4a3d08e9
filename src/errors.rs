use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::RoleName;

/// Error type for configuration, dataset alignment, tensor shape, and training lifecycle failures.
///
/// Every variant is fatal for the run that produced it; nothing in this crate
/// retries or downgrades these to warnings.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(
        "dataset roles are misaligned: role '{role}' has {actual} samples but role '{reference}' has {expected}"
    )]
    Alignment {
        reference: RoleName,
        expected: usize,
        role: RoleName,
        actual: usize,
    },
    #[error("shape mismatch for '{name}': expected {expected:?}, got {actual:?}")]
    Shape {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("dataset directory '{}' is unavailable: {reason}", path.display())]
    DatasetUnavailable { path: PathBuf, reason: String },
    #[error("failed to decode image '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("sample index {index} is out of range for a dataset of {len} samples")]
    OutOfRange { index: usize, len: usize },
    #[error("'{operation}' cannot run while the model is {actual} (expected {expected})")]
    Lifecycle {
        operation: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("tensor data error: {0}")]
    TensorData(String),
    #[error("data loader stopped: {0}")]
    LoaderStopped(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("invalid options file: {0}")]
    Options(#[from] serde_json::Error),
}
