//! Linear-to-mel filterbank and its pseudo-inverse.
//!
//! Triangles are placed on the HTK mel scale over `[0, sr/2]` with the DC bin
//! zeroed. Each band is weighted by the constant-energy factor of its
//! Slaney-scale support and then renormalized so its weights sum to 1.

use crate::{Error, Result};
use ndarray::Array2;

/// Analysis frame length in hops.
pub const FRAME_MULTIPLIER: usize = 4;

#[inline]
fn hz_to_mel_htk(hz: f64) -> f64 {
    1127.0 * (1.0 + hz / 700.0).ln()
}

// Slaney scale: linear below 1 kHz, logarithmic above.
const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

#[inline]
fn logstep() -> f64 {
    6.4f64.ln() / 27.0
}

#[inline]
fn hz_to_mel_slaney(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / logstep()
    } else {
        hz / F_SP
    }
}

#[inline]
fn mel_to_hz_slaney(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (logstep() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// `n` frequencies evenly spaced on the Slaney mel scale.
fn mel_frequencies(n: usize, fmin: f64, fmax: f64) -> Vec<f64> {
    let lo = hz_to_mel_slaney(fmin);
    let hi = hz_to_mel_slaney(fmax);
    (0..n)
        .map(|i| mel_to_hz_slaney(lo + (hi - lo) * i as f64 / (n - 1) as f64))
        .collect()
}

/// Forward `[freq_bins, mel_bins]` and inverse `[mel_bins, freq_bins]` mel
/// matrices for one `(sample_rate, hop, mel_bins)` configuration.
#[derive(Debug, Clone)]
pub struct MelTransform {
    forward: Array2<f32>,
    inverse: Array2<f32>,
    sample_rate: u32,
    hop: usize,
    fft_size: usize,
    empty_bands: Vec<usize>,
}

impl MelTransform {
    pub fn new(sample_rate: u32, hop: usize, mel_bins: usize) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::InvalidConfig("sample_rate must be positive".into()));
        }
        if hop == 0 {
            return Err(Error::InvalidConfig("hop must be positive".into()));
        }
        if mel_bins == 0 {
            return Err(Error::InvalidConfig("mel_bins must be positive".into()));
        }

        let fft_size = FRAME_MULTIPLIER * hop;
        let freq_bins = fft_size / 2 + 1;
        let nyquist = sample_rate as f64 / 2.0;
        let upper_hz = (sample_rate / 2) as f64;

        // Triangular weights on the HTK scale.
        let lo_mel = hz_to_mel_htk(0.0);
        let hi_mel = hz_to_mel_htk(upper_hz);
        let edges: Vec<f64> = (0..mel_bins + 2)
            .map(|i| lo_mel + (hi_mel - lo_mel) * i as f64 / (mel_bins + 1) as f64)
            .collect();

        let mut weights = Array2::<f64>::zeros((freq_bins, mel_bins));
        for f in 1..freq_bins {
            let bin_mel = hz_to_mel_htk(nyquist * f as f64 / (freq_bins - 1) as f64);
            for m in 0..mel_bins {
                let (lower, center, upper) = (edges[m], edges[m + 1], edges[m + 2]);
                let rising = (bin_mel - lower) / (center - lower);
                let falling = (upper - bin_mel) / (upper - center);
                weights[[f, m]] = rising.min(falling).max(0.0);
            }
        }

        // Constant-energy weighting, then unit-sum columns.
        let band_hz = mel_frequencies(mel_bins + 2, 0.0, upper_hz);
        let mut empty_bands = Vec::new();
        for m in 0..mel_bins {
            let enorm = 2.0 / (band_hz[m + 2] - band_hz[m]);
            let mut column = weights.column_mut(m);
            column.mapv_inplace(|w| w * enorm);
            let total: f64 = column.sum();
            if total > 0.0 && total.is_finite() {
                column.mapv_inplace(|w| w / total);
            } else {
                column.fill(0.0);
                empty_bands.push(m);
            }
        }

        if !empty_bands.is_empty() {
            tracing::debug!(
                "Mel filterbank: {} of {} bands have no FFT bin support (sr={}, hop={})",
                empty_bands.len(),
                mel_bins,
                sample_rate,
                hop
            );
        }

        let mut inverse = Array2::<f64>::zeros((mel_bins, freq_bins));
        for f in 0..freq_bins {
            let row = weights.row(f);
            let total: f64 = row.sum();
            if total > 0.0 && total.is_finite() {
                for m in 0..mel_bins {
                    inverse[[m, f]] = row[m] / total;
                }
            }
        }

        Ok(Self {
            forward: weights.mapv(|w| w as f32),
            inverse: inverse.mapv(|w| w as f32),
            sample_rate,
            hop,
            fft_size,
            empty_bands,
        })
    }

    /// `[freq_bins, mel_bins]`
    pub fn forward(&self) -> &Array2<f32> {
        &self.forward
    }

    /// `[mel_bins, freq_bins]`
    pub fn inverse(&self) -> &Array2<f32> {
        &self.inverse
    }

    pub fn freq_bins(&self) -> usize {
        self.forward.nrows()
    }

    pub fn mel_bins(&self) -> usize {
        self.forward.ncols()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Bands whose triangle covers no FFT bin. Their weights are all zero.
    pub fn empty_bands(&self) -> &[usize] {
        &self.empty_bands
    }

    /// `[time, freq_bins]` -> `[time, mel_bins]`
    pub fn apply(&self, spec: &Array2<f32>) -> Result<Array2<f32>> {
        if spec.ncols() != self.freq_bins() {
            return Err(Error::Shape(format!(
                "spectrogram has {} bins, mel transform expects {}",
                spec.ncols(),
                self.freq_bins()
            )));
        }
        Ok(spec.dot(&self.forward))
    }

    /// `[time, mel_bins]` -> `[time, freq_bins]`. Lossy where bands overlap.
    pub fn invert(&self, mel: &Array2<f32>) -> Result<Array2<f32>> {
        if mel.ncols() != self.mel_bins() {
            return Err(Error::Shape(format!(
                "mel spectrogram has {} bands, mel transform expects {}",
                mel.ncols(),
                self.mel_bins()
            )));
        }
        Ok(mel.dot(&self.inverse))
    }
}
