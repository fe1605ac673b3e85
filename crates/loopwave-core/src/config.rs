//! Synthesis configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Signal-processing and latent-field constants.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// sample_rate = 48000
/// mel_bins = 128
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// STFT hop in samples. Frame and FFT length are `4 * hop`.
    pub hop: usize,
    pub mel_bins: usize,
    /// Mean of the dB-domain affine rescale.
    pub mu_rescale: f32,
    /// Standard deviation of the dB-domain affine rescale.
    pub sigma_rescale: f32,
    /// Reference level subtracted before mel projection.
    pub ref_level_db: f32,
    /// Generator context window in latent steps. Must be divisible by 4.
    pub latlen: usize,
    /// Interpolation steps between two anchors.
    pub coordlen: usize,
    /// Depth of the per-anchor local coordinate.
    pub coord_depth: usize,
    /// Latent depth of a single audio channel.
    pub latdepth: usize,
    /// Spectrogram frames per first-stage decoder block.
    pub shape: usize,
    /// Encoder window in frames.
    pub window: usize,
    /// Audio seconds produced by one generator block.
    pub block_seconds: f32,
    pub batch_size: usize,
    /// Default truncation bound for anchor sampling.
    pub truncation: f32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            hop: 256,
            mel_bins: 256,
            mu_rescale: -25.0,
            sigma_rescale: 75.0,
            ref_level_db: 0.0,
            latlen: 256,
            coordlen: 384,
            coord_depth: 64,
            latdepth: 64,
            shape: 128,
            window: 64,
            block_seconds: 23.0,
            batch_size: 64,
            truncation: 2.0,
        }
    }
}

impl SynthConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample_rate must be positive".into()));
        }
        if self.hop == 0 {
            return Err(Error::InvalidConfig("hop must be positive".into()));
        }
        if self.mel_bins == 0 {
            return Err(Error::InvalidConfig("mel_bins must be positive".into()));
        }
        if !self.sigma_rescale.is_finite() || self.sigma_rescale == 0.0 {
            return Err(Error::InvalidConfig(format!(
                "sigma_rescale {} must be finite and non-zero",
                self.sigma_rescale
            )));
        }
        if self.latlen == 0 || self.latlen % 4 != 0 {
            return Err(Error::InvalidConfig(format!(
                "latlen {} must be a positive multiple of 4",
                self.latlen
            )));
        }
        if self.coordlen < self.latlen {
            return Err(Error::InvalidConfig(format!(
                "coordlen {} must be at least latlen {}",
                self.coordlen, self.latlen
            )));
        }
        if self.coord_depth == 0 || self.latdepth == 0 {
            return Err(Error::InvalidConfig(
                "coord_depth and latdepth must be positive".into(),
            ));
        }
        if self.shape == 0 || self.shape % 2 != 0 {
            return Err(Error::InvalidConfig(format!(
                "shape {} must be a positive even frame count",
                self.shape
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be positive".into()));
        }
        if !self.block_seconds.is_finite() || self.block_seconds <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "block_seconds {} must be positive",
                self.block_seconds
            )));
        }
        Ok(())
    }

    /// FFT and analysis frame length.
    pub fn fft_size(&self) -> usize {
        4 * self.hop
    }

    /// Number of generator blocks needed to cover `seconds` of audio.
    pub fn blocks_for_seconds(&self, seconds: f32) -> usize {
        (seconds.max(0.0) / self.block_seconds).floor() as usize + 1
    }
}
