//! Error types for the spectral codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid codec configuration: {0}")]
    InvalidConfig(String),

    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error(transparent)]
    Core(#[from] loopwave_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<ndarray::ShapeError> for Error {
    fn from(e: ndarray::ShapeError) -> Self {
        Error::Shape(e.to_string())
    }
}
