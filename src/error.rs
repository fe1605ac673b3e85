//! Centralized error type for the loopwave umbrella crate.
//!
//! Each variant names the pipeline stage that failed, so `?` propagates
//! subsystem errors without losing where they came from.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config: {0}")]
    Config(#[from] loopwave_core::Error),

    #[error("Codec: {0}")]
    Codec(#[from] loopwave_codec::Error),

    #[error("Runner: {0}")]
    Runner(#[from] loopwave_neural::RunnerError),

    #[error("Latent field: {0}")]
    LatentField(#[from] loopwave_latent::Error),

    #[error("No {0} model in this model set")]
    MissingModel(&'static str),

    /// Decoder outputs that cannot be laid back out as two channels.
    #[error("Assembler: {0}")]
    Assembler(String),

    #[cfg(feature = "export")]
    #[error("Export: {0}")]
    Export(#[from] loopwave_export::ExportError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn assembler(e: impl std::fmt::Display) -> Self {
        Error::Assembler(e.to_string())
    }
}
