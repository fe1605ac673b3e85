//! Short-time Fourier transform with a periodic Hann window.
//!
//! Analysis drops a trailing partial frame (no end padding). Synthesis uses
//! the dual window `hann / sum(hann^2)` over overlapping frames, so
//! `synthesize(analyze(x))` reproduces `x` wherever at least one frame has a
//! non-zero window weight.

use crate::{Error, Result};
use ndarray::Array2;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Stft {
    hop: usize,
    frame_len: usize,
    window: Vec<f32>,
    synthesis_window: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl fmt::Debug for Stft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stft")
            .field("hop", &self.hop)
            .field("frame_len", &self.frame_len)
            .finish()
    }
}

impl Stft {
    /// Frame length is `multiplier * hop`; the FFT length equals the frame
    /// length.
    pub fn new(hop: usize, multiplier: usize) -> Result<Self> {
        if hop == 0 || multiplier == 0 {
            return Err(Error::InvalidConfig(format!(
                "STFT needs positive hop and frame multiplier, got hop={} multiplier={}",
                hop, multiplier
            )));
        }
        let frame_len = hop * multiplier;

        let window: Vec<f32> = (0..frame_len)
            .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / frame_len as f32).cos())
            .collect();

        // Sum of squared windows landing on each position within one hop.
        let mut overlap = vec![0.0f32; hop];
        for (n, w) in window.iter().enumerate() {
            overlap[n % hop] += w * w;
        }
        let synthesis_window = window
            .iter()
            .enumerate()
            .map(|(n, w)| {
                let denom = overlap[n % hop];
                if denom > 0.0 {
                    w / denom
                } else {
                    0.0
                }
            })
            .collect();

        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(frame_len);
        let inverse = planner.plan_fft_inverse(frame_len);

        Ok(Self {
            hop,
            frame_len,
            window,
            synthesis_window,
            forward,
            inverse,
        })
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Non-negative frequency bins per frame: `frame_len / 2 + 1`.
    pub fn bins(&self) -> usize {
        self.frame_len / 2 + 1
    }

    /// Complete frames in a signal of `len` samples.
    pub fn frame_count(&self, len: usize) -> usize {
        if len < self.frame_len {
            0
        } else {
            (len - self.frame_len) / self.hop + 1
        }
    }

    /// Samples produced by synthesizing `frames` frames.
    pub fn output_len(&self, frames: usize) -> usize {
        if frames == 0 {
            0
        } else {
            (frames - 1) * self.hop + self.frame_len
        }
    }

    /// `[frames, bins]` complex spectrogram.
    pub fn analyze(&self, signal: &[f32]) -> Array2<Complex<f32>> {
        let frames = self.frame_count(signal.len());
        let bins = self.bins();
        let mut out = Array2::<Complex<f32>>::zeros((frames, bins));
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.frame_len];

        for (i, mut row) in out.rows_mut().into_iter().enumerate() {
            let start = i * self.hop;
            let frame = &signal[start..start + self.frame_len];
            for ((slot, s), w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                *slot = Complex::new(s * w, 0.0);
            }
            self.forward.process(&mut buffer);
            for (dst, src) in row.iter_mut().zip(&buffer[..bins]) {
                *dst = *src;
            }
        }
        out
    }

    /// Inverse of [`analyze`](Self::analyze) by windowed overlap-add.
    ///
    /// Spectra with fewer than [`bins`](Self::bins) columns are zero-padded at
    /// the top; the imaginary parts of the DC and Nyquist bins are ignored.
    pub fn synthesize(&self, spectrum: &Array2<Complex<f32>>) -> Result<Vec<f32>> {
        let (frames, given_bins) = spectrum.dim();
        let bins = self.bins();
        if given_bins > bins {
            return Err(Error::Shape(format!(
                "spectrum has {} bins, frame length {} allows at most {}",
                given_bins, self.frame_len, bins
            )));
        }

        let mut output = vec![0.0f32; self.output_len(frames)];
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.frame_len];
        let scale = 1.0 / self.frame_len as f32;
        let nyquist = self.frame_len / 2;

        for (i, row) in spectrum.rows().into_iter().enumerate() {
            buffer.fill(Complex::new(0.0, 0.0));
            for (k, value) in row.iter().enumerate() {
                buffer[k] = *value;
            }
            buffer[0].im = 0.0;
            if self.frame_len % 2 == 0 {
                buffer[nyquist].im = 0.0;
            }
            // Hermitian mirror for a real-valued frame.
            for k in (nyquist + 1)..self.frame_len {
                buffer[k] = buffer[self.frame_len - k].conj();
            }
            self.inverse.process(&mut buffer);

            let start = i * self.hop;
            for (n, (sample, w)) in buffer.iter().zip(&self.synthesis_window).enumerate() {
                output[start + n] += sample.re * scale * w;
            }
        }
        Ok(output)
    }
}
