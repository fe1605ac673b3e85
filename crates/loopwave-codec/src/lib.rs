//! # loopwave-codec
//!
//! Bidirectional spectral codec between raw waveforms and the normalized
//! magnitude/phase representation consumed by the decoder models.
//!
//! - **MelTransform**: forward and pseudo-inverse linear-to-mel matrices
//! - **Normalizer**: affine dB rescale into the model range and back
//! - **Stft**: framed analysis and overlap-add synthesis (periodic Hann)
//! - **SpectralCodec**: waveform -> mel / spectral frames, and back to audio
//!
//! All matrices are built once from [`loopwave_core::SynthConfig`] and then
//! shared read-only.
//!
//! ## Example
//!
//! ```rust
//! use loopwave_codec::SpectralCodec;
//! use loopwave_core::SynthConfig;
//!
//! let codec = SpectralCodec::new(&SynthConfig::default()).unwrap();
//! let silence = vec![0.0f32; 44100];
//! let mel = codec.waveform_to_mel(&silence, Some(80.0)).unwrap();
//! assert_eq!(mel.ncols(), 256);
//! ```

mod error;
pub use error::{Error, Result};

pub mod db;
pub use db::{amp_to_db, db_to_amp, db_to_power, power_to_db, power_to_db_batch, AMIN};

mod mel;
pub use mel::{MelTransform, FRAME_MULTIPLIER};

mod normalize;
pub use normalize::Normalizer;

mod stft;
pub use stft::Stft;

mod codec;
pub use codec::{SpectralCodec, SpectralFrame, RECONSTRUCTION_EPS};
