//! Owned stereo output buffer.

use crate::{Error, Result};

/// Interleaved stereo audio, amplitude clipped to `[-1, 1]`.
///
/// Built once by the waveform assembler and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct StereoWaveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl StereoWaveform {
    pub const CHANNELS: usize = 2;

    /// Interleave two channels, clipping every sample to `[-1, 1]`.
    pub fn from_channels(left: &[f32], right: &[f32], sample_rate: u32) -> Result<Self> {
        if left.len() != right.len() {
            return Err(Error::Shape(format!(
                "left channel has {} samples, right has {}",
                left.len(),
                right.len()
            )));
        }
        let samples = left
            .iter()
            .zip(right)
            .flat_map(|(l, r)| [clip(*l), clip(*r)])
            .collect();
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Interleaved `[l0, r0, l1, r1, ...]` samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of stereo frames.
    pub fn frames(&self) -> usize {
        self.samples.len() / Self::CHANNELS
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples of one channel (0 = left, 1 = right).
    pub fn channel(&self, index: usize) -> impl Iterator<Item = f32> + '_ {
        self.samples
            .iter()
            .skip(index)
            .step_by(Self::CHANNELS)
            .copied()
    }

    pub fn left(&self) -> Vec<f32> {
        self.channel(0).collect()
    }

    pub fn right(&self) -> Vec<f32> {
        self.channel(1).collect()
    }

    /// Keep at most `frames` stereo frames.
    pub fn truncated(mut self, frames: usize) -> Self {
        self.samples.truncate(frames * Self::CHANNELS);
        self
    }
}

#[inline]
fn clip(sample: f32) -> f32 {
    if sample.is_nan() {
        0.0
    } else {
        sample.clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave_and_clip() {
        let wave = StereoWaveform::from_channels(&[0.5, 2.0], &[-3.0, 0.25], 44100).unwrap();
        assert_eq!(wave.samples(), &[0.5, -1.0, 1.0, 0.25]);
        assert_eq!(wave.frames(), 2);
        assert_eq!(wave.left(), vec![0.5, 1.0]);
        assert_eq!(wave.right(), vec![-1.0, 0.25]);
    }

    #[test]
    fn test_channel_length_mismatch() {
        assert!(StereoWaveform::from_channels(&[0.0; 3], &[0.0; 2], 44100).is_err());
    }

    #[test]
    fn test_truncated() {
        let wave = StereoWaveform::from_channels(&[0.1; 10], &[0.2; 10], 10).unwrap();
        let short = wave.truncated(4);
        assert_eq!(short.frames(), 4);
        assert!((short.duration_seconds() - 0.4).abs() < 1e-9);
        assert_eq!(short.clone().truncated(100).frames(), 4);
    }
}
