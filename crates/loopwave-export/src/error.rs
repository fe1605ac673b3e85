//! Error types for loopwave-export

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Latent file not found: {0}")]
    NotFound(String),

    /// Malformed or unreadable `.npy` content
    #[error("Invalid latent file {path}: {reason}")]
    InvalidLatent { path: String, reason: String },

    #[error("Invalid audio data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, ExportError>;

impl From<hound::Error> for ExportError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => ExportError::Io(io),
            other => ExportError::Io(io::Error::other(other)),
        }
    }
}
