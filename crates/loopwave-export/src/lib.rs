//! # loopwave-export
//!
//! The file boundary of loopwave:
//!
//! - [`write_audio`]: stereo waveform to 16-bit PCM WAV (scaling happens here
//!   and nowhere else)
//! - [`read_latent`]: `[time, depth]` latent array from a `.npy` file
//!
//! ```rust,no_run
//! use loopwave_core::StereoWaveform;
//! use loopwave_export::write_audio;
//!
//! let wave = StereoWaveform::from_channels(&[0.0; 4410], &[0.0; 4410], 44100).unwrap();
//! write_audio("silence.wav", 44100, &wave).unwrap();
//! ```

mod error;
pub use error::{ExportError, Result};

pub mod format;
pub use format::npy::{read_latent, write_latent};
pub use format::wav::{encode_wav_memory, read_audio, to_pcm16, write_audio};
