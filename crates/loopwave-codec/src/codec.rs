//! Waveform <-> normalized spectral representation.

use crate::db::{db_to_power, power_to_db, AMIN};
use crate::mel::{MelTransform, FRAME_MULTIPLIER};
use crate::normalize::Normalizer;
use crate::stft::Stft;
use crate::{Error, Result};
use loopwave_core::{StereoWaveform, SynthConfig};
use ndarray::{Array2, Array3, ArrayView2, Axis, Zip};
use rustfft::num_complex::Complex;
use std::f32::consts::PI;

/// Added to power before the square root during reconstruction.
pub const RECONSTRUCTION_EPS: f32 = 1e-7;

/// Normalized dB magnitude and phase (radians / pi), both `[time, bins]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFrame {
    magnitude: Array2<f32>,
    phase: Array2<f32>,
}

impl SpectralFrame {
    pub fn new(magnitude: Array2<f32>, phase: Array2<f32>) -> Result<Self> {
        if magnitude.dim() != phase.dim() {
            return Err(Error::Shape(format!(
                "magnitude {:?} and phase {:?} differ in shape",
                magnitude.dim(),
                phase.dim()
            )));
        }
        Ok(Self { magnitude, phase })
    }

    pub fn magnitude(&self) -> &Array2<f32> {
        &self.magnitude
    }

    pub fn phase(&self) -> &Array2<f32> {
        &self.phase
    }

    pub fn frames(&self) -> usize {
        self.magnitude.nrows()
    }

    pub fn bins(&self) -> usize {
        self.magnitude.ncols()
    }

    pub fn into_parts(self) -> (Array2<f32>, Array2<f32>) {
        (self.magnitude, self.phase)
    }
}

/// Spectral analysis and reconstruction for one [`SynthConfig`].
///
/// Holds the mel matrices, the normalizer and the STFT plans. Built once and
/// shared by reference; every method takes `&self`.
#[derive(Debug, Clone)]
pub struct SpectralCodec {
    mel: MelTransform,
    normalizer: Normalizer,
    stft: Stft,
    ref_level_db: f32,
    sample_rate: u32,
    hop: usize,
    mel_bins: usize,
}

impl SpectralCodec {
    pub fn new(config: &SynthConfig) -> Result<Self> {
        config.validate()?;
        let mel = MelTransform::new(config.sample_rate, config.hop, config.mel_bins)?;
        let normalizer = Normalizer::new(config.mu_rescale, config.sigma_rescale)?;
        let stft = Stft::new(config.hop, FRAME_MULTIPLIER)?;

        tracing::debug!(
            "SpectralCodec ready: sr={} hop={} fft={} mel_bins={}",
            config.sample_rate,
            config.hop,
            stft.frame_len(),
            config.mel_bins
        );

        Ok(Self {
            mel,
            normalizer,
            stft,
            ref_level_db: config.ref_level_db,
            sample_rate: config.sample_rate,
            hop: config.hop,
            mel_bins: config.mel_bins,
        })
    }

    pub fn mel(&self) -> &MelTransform {
        &self.mel
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn stft(&self) -> &Stft {
        &self.stft
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Normalized value of a silent bin in [`waveform_to_mel`](Self::waveform_to_mel).
    pub fn magnitude_floor(&self) -> f32 {
        self.normalizer
            .normalize_value(10.0 * AMIN.log10() - self.ref_level_db)
    }

    fn power_db(&self, stft: &Stft, wv: &[f32], top_db: Option<f32>) -> Array2<f32> {
        let power = stft.analyze(wv).mapv(|c| c.norm_sqr());
        power_to_db(&power, 1.0, AMIN, top_db)
    }

    /// `[frames, mel_bins]` normalized mel magnitude.
    pub fn waveform_to_mel(&self, wv: &[f32], top_db: Option<f32>) -> Result<Array2<f32>> {
        let db = self.power_db(&self.stft, wv, top_db) - self.ref_level_db;
        self.mel.apply(&self.normalizer.normalize(&db, false))
    }

    /// Linear-bin normalized magnitude and phase. Inverse of
    /// [`reconstruct_frame`](Self::reconstruct_frame) up to edge effects.
    pub fn waveform_to_spectral(&self, wv: &[f32]) -> Result<SpectralFrame> {
        let spectrum = self.stft.analyze(wv);
        let power = spectrum.mapv(|c| c.norm_sqr());
        let magnitude = self
            .normalizer
            .normalize(&power_to_db(&power, 1.0, AMIN, None), false);
        let phase = spectrum.mapv(|c| c.arg() / PI);
        SpectralFrame::new(magnitude, phase)
    }

    /// Normalized linear dB magnitude at an arbitrary hop and frame multiplier.
    pub fn waveform_to_spec(&self, wv: &[f32], hop: usize, multiplier: usize) -> Result<Array2<f32>> {
        let stft = Stft::new(hop, multiplier)?;
        Ok(self
            .normalizer
            .normalize(&self.power_db(&stft, wv, None), false))
    }

    /// Mel magnitude at a custom hop. The mel matrix is rebuilt for the
    /// matching bin count.
    pub fn waveform_to_mel_hop(&self, wv: &[f32], top_db: Option<f32>, hop: usize) -> Result<Array2<f32>> {
        let stft = Stft::new(hop, FRAME_MULTIPLIER)?;
        let mel = MelTransform::new(self.sample_rate, hop, self.mel_bins)?;
        let normalized = self
            .normalizer
            .normalize(&self.power_db(&stft, wv, top_db), false);
        mel.apply(&normalized)
    }

    /// `[time, mel_bins]` -> `[time, freq_bins]`.
    pub fn mel_to_linear_spec(&self, mel: &Array2<f32>) -> Result<Array2<f32>> {
        self.mel.invert(mel)
    }

    /// `[time, freq_bins]` -> `[time, mel_bins]`.
    pub fn linear_spec_to_mel(&self, spec: &Array2<f32>) -> Result<Array2<f32>> {
        self.mel.apply(spec)
    }

    /// Waveform from `[blocks, time, bins]` magnitude and phase.
    ///
    /// Blocks are joined in order into one timeline before the inverse
    /// transform, so consecutive blocks reconstruct as a continuous signal.
    pub fn reconstruct_waveform(&self, magnitude: &Array3<f32>, phase: &Array3<f32>) -> Result<Vec<f32>> {
        if magnitude.dim() != phase.dim() {
            return Err(Error::Shape(format!(
                "magnitude {:?} and phase {:?} differ in shape",
                magnitude.dim(),
                phase.dim()
            )));
        }
        let (blocks, time, bins) = magnitude.dim();
        let magnitude = magnitude.to_shape((blocks * time, bins))?;
        let phase = phase.to_shape((blocks * time, bins))?;

        tracing::debug!(
            "Reconstructing {} blocks x {} frames x {} bins",
            blocks,
            time,
            bins
        );
        self.synthesize(magnitude.view(), phase.view())
    }

    pub fn reconstruct_frame(&self, frame: &SpectralFrame) -> Result<Vec<f32>> {
        self.synthesize(frame.magnitude.view(), frame.phase.view())
    }

    fn synthesize(&self, magnitude: ArrayView2<'_, f32>, phase: ArrayView2<'_, f32>) -> Result<Vec<f32>> {
        let mut spectrum = Array2::<Complex<f32>>::zeros(magnitude.dim());
        Zip::from(&mut spectrum)
            .and(magnitude)
            .and(phase)
            .for_each(|out, &m, &p| {
                let db = self.normalizer.denormalize_value(m);
                let amplitude = (db_to_power(db, 1.0) + RECONSTRUCTION_EPS).sqrt();
                *out = Complex::from_polar(amplitude, p * PI);
            });
        self.stft.synthesize(&spectrum)
    }

    /// Display matrix `[mel_bins, time]` of the first `seconds` of a stereo
    /// waveform, highest band in row 0, clipped to `[-1, 1]`.
    pub fn preview_spectrogram(&self, wave: &StereoWaveform, seconds: f32) -> Result<Array2<f32>> {
        let frames = ((seconds.max(0.0) * wave.sample_rate() as f32) as usize).min(wave.frames());
        let mono: Vec<f32> = wave
            .samples()
            .chunks_exact(StereoWaveform::CHANNELS)
            .take(frames)
            .map(|pair| (pair[0] + pair[1]) / 2.0)
            .collect();

        let mel = self.waveform_to_mel_hop(&mono, Some(80.0), self.hop * 2)?;
        let mut image = mel.reversed_axes();
        image.invert_axis(Axis(0));
        image.mapv_inplace(|v| v.clamp(-1.0, 1.0));
        Ok(image)
    }
}
