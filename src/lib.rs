//! # loopwave - long-form stereo synthesis from fixed-window generators
//!
//! A generative model that only emits fixed-length latent chunks is turned
//! into arbitrarily long, optionally loopable, stereo audio.
//!
//! ## Architecture
//!
//! loopwave is an umbrella crate that coordinates:
//! - **loopwave-core** - Config, tensor layout, the `LatentModel` capability
//! - **loopwave-codec** - Mel filterbank, normalization, STFT and reconstruction
//! - **loopwave-latent** - Continuous latent-field construction
//! - **loopwave-neural** - Fixed-batch chunked inference (sequential or rayon)
//! - **loopwave-export** - 16-bit WAV output and `.npy` latent input
//! - **loopwave-burn** - Burn forward passes as `LatentModel`s
//!
//! ## Pipeline
//!
//! latent field -> generator -> per-channel decoder stage 2 -> decoder
//! stage 1 (magnitude, phase) -> inverse STFT -> interleaved stereo. The
//! decode-only path starts from an external latent and skips the generator.
//!
//! ## Quick Start
//!
//! ```ignore
//! use loopwave::prelude::*;
//!
//! let synth = Synthesizer::new(SynthConfig::from_file("synth.toml")?)?;
//! let models = ModelSet::new(generator, decoder, decoder2);
//!
//! // 60 seconds of long-form audio
//! let wave = synth.generate_seconds(&models, 60.0, 2.0, 42)?;
//! loopwave::export::write_audio("out.wav", wave.sample_rate(), &wave)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `export` (default) - WAV writing, `.npy` reading, directory batch entry points
//! - `parallel` - Dispatch chunks on the rayon pool by default
//! - `burn` - Burn model adapter (CPU)
//! - `gpu` - Burn wgpu backend

/// Re-export of loopwave-core for direct access
pub use loopwave_core as core;
pub use loopwave_codec as codec;
pub use loopwave_latent as latent;
pub use loopwave_neural as neural;

#[cfg(feature = "export")]
pub use loopwave_export as export;

#[cfg(feature = "burn")]
pub use loopwave_burn as burn;

pub use loopwave_core::{FnModel, InferenceError, LatentModel, ModelOutput, StereoWaveform, SynthConfig};
pub use loopwave_latent::LatentCoordinateField;
pub use loopwave_neural::{CancelToken, ExecutionMode};

mod error;
pub use error::{Error, Result};

mod assembler;
pub use assembler::{Decoders, WaveformAssembler, DECODER_BLOCK_STEPS};

mod synthesizer;
pub use synthesizer::{ModelSet, Synthesizer, SynthesizerBuilder};

#[cfg(feature = "export")]
mod batch;

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{ModelSet, Synthesizer, SynthesizerBuilder};

    pub use crate::core::{FnModel, LatentModel, ModelOutput, StereoWaveform, SynthConfig};
    pub use crate::latent::LatentCoordinateField;
    pub use crate::neural::{CancelToken, ExecutionMode};

    // Seeded request RNG
    pub use rand::SeedableRng;
    pub use rand_chacha::ChaCha8Rng;

    #[cfg(feature = "export")]
    pub use crate::export::{read_latent, write_audio};

    #[cfg(feature = "burn")]
    pub use crate::burn::{BurnModel, BurnOutput};
}
