//! Core types shared by every loopwave subsystem.
//!
//! # Primary API
//!
//! - [`SynthConfig`]: Signal-processing and latent-field constants, loadable from TOML
//! - [`LatentModel`]: The external model capability (generator, decoder stages)
//! - [`layout`]: Batch/time restacking primitives for `[batch, channel, time, depth]` tensors
//! - [`StereoWaveform`]: The owned output of every synthesis request
//!
//! Tensors are plain `ndarray::Array4<f32>` values. No ML framework type
//! crosses these APIs; see `loopwave-burn` for a Burn adapter.

pub mod error;
pub use error::{Error, Result};

mod config;
pub use config::SynthConfig;

pub mod layout;

pub mod model;
pub use model::{FnModel, ForwardFn, InferenceError, LatentModel, ModelOutput};

mod waveform;
pub use waveform::StereoWaveform;
