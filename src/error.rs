// src/error.rs
//
// Failure taxonomy for the analysis core. Every variant is deterministic
// for a given input, so nothing here is ever retried internally.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("forecast requested before the trend model was trained")]
    ModelNotTrained,

    #[error("unknown traffic pattern label: {0:?}")]
    UnknownPattern(String),
}
