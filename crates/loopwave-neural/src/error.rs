//! Error types for batched inference.

use loopwave_core::InferenceError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RunnerError>;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Batch size must be at least 1")]
    InvalidBatchSize,

    #[error("Input has an empty batch axis")]
    EmptyInput,

    #[error("Model '{model}' failed on chunk {chunk}: {source}")]
    Inference {
        model: String,
        chunk: usize,
        #[source]
        source: InferenceError,
    },

    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("Run cancelled")]
    Cancelled,
}

impl From<loopwave_core::Error> for RunnerError {
    fn from(e: loopwave_core::Error) -> Self {
        RunnerError::Shape(e.to_string())
    }
}
