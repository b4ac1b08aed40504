pub mod tree;
pub mod xgboost;

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

pub use xgboost::XgbModel;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("cannot read model file {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid model JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid model parameter {name}: {value:?}")]
    InvalidParam { name: &'static str, value: String },
    #[error("unsupported model feature: {0}")]
    Unsupported(String),
    #[error("malformed tree {index}: {reason}")]
    MalformedTree { index: usize, reason: String },
    #[error("feature shape mismatch, expected: {expected}, got {got}")]
    FeatureMismatch { expected: usize, got: usize },
}

/// One output per input row: a class label for classifiers, a value for regressors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Prediction {
    Label(u32),
    Value(f64),
}

/// A loaded, read-only model shared across requests.
pub trait Classifier: Send + Sync {
    /// Number of columns each row must have.
    fn num_features(&self) -> usize;

    /// Predict a row-major batch.
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<Prediction>, ModelError>;
}
