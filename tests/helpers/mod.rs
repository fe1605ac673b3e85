//! Test helpers and fixtures for loopwave integration tests
//!
//! Models are closure mocks with known shape behavior, so every pipeline
//! length can be computed by hand:
//!
//! - generator: keeps the first `2 * latdepth` depth columns, time unchanged
//! - decoder stage 2: identity once its folded sub-blocks are put back in order
//! - decoder stage 1: constant magnitude and zero phase over `STAGE1_BINS` bins
//!
//! Decoder mocks receive their batch folded group-major (all first halves,
//! then all second halves) and unfold it the way a trained decoder does.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module.

#![allow(dead_code)]

pub mod tolerances;

use loopwave::core::layout::fold_batch_groups_into_time;
use loopwave::prelude::*;
use loopwave::InferenceError;
use ndarray::{s, Array4, ArrayView4};
use parking_lot::Mutex;
use std::sync::Arc;

/// Small geometry that keeps tests fast: 64-sample frames, 16-step windows.
pub fn test_config() -> SynthConfig {
    SynthConfig {
        sample_rate: 8000,
        hop: 16,
        mel_bins: 8,
        latlen: 16,
        coordlen: 24,
        coord_depth: 4,
        latdepth: 2,
        shape: 4,
        window: 4,
        block_seconds: 0.05,
        batch_size: 3,
        ..SynthConfig::default()
    }
}

/// Route `tracing` output to the test harness. `RUST_LOG=loopwave=debug`
/// shows per-chunk shapes.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn test_synth() -> Synthesizer {
    Synthesizer::new(test_config()).expect("Failed to create test synthesizer")
}

/// Bins emitted by the mock first-stage decoder (zero-padded by the codec).
pub const STAGE1_BINS: usize = 3;

/// Stereo latent depth of [`test_config`].
pub const LATENT_DEPTH: usize = 4;

pub fn mock_generator() -> FnModel {
    FnModel::single("mock-generator", |x| Ok(x.slice(s![.., .., .., ..LATENT_DEPTH]).to_owned()))
}

/// Put a decoder's folded sub-blocks back onto the time axis.
pub fn unfold(x: ArrayView4<'_, f32>) -> Result<Array4<f32>, InferenceError> {
    fold_batch_groups_into_time(&x, 2).map_err(|e| InferenceError::ForwardFailed(e.to_string()))
}

pub fn mock_stage2() -> FnModel {
    FnModel::single("mock-stage2", unfold)
}

/// Normalized magnitude `level` on every bin, zero phase.
pub fn mock_stage1(level: f32) -> FnModel {
    FnModel::dual("mock-stage1", move |x| {
        let (b, c, t, _) = unfold(x)?.dim();
        Ok((
            Array4::from_elem((b, c, t, STAGE1_BINS), level),
            Array4::zeros((b, c, t, STAGE1_BINS)),
        ))
    })
}

/// Magnitude and phase follow the latent values, so the waveform depends on
/// the input field.
pub fn following_stage1() -> FnModel {
    FnModel::dual("following-stage1", |x| {
        let x = unfold(x)?;
        let magnitude = x.mapv(|v| (0.1 * v - 0.5).clamp(-1.0, 1.0));
        let phase = x.mapv(|v| (0.1 * v).clamp(-1.0, 1.0));
        Ok((magnitude, phase))
    })
}

/// Silent stage 1 that keeps every unfolded block it is handed, in call order.
pub fn recording_stage1(seen: Arc<Mutex<Vec<Array4<f32>>>>) -> FnModel {
    FnModel::dual("recording-stage1", move |x| {
        let x = unfold(x)?;
        let (b, c, t, _) = x.dim();
        seen.lock().push(x);
        Ok((
            Array4::from_elem((b, c, t, STAGE1_BINS), -1.0),
            Array4::zeros((b, c, t, STAGE1_BINS)),
        ))
    })
}

pub fn following_models() -> ModelSet {
    ModelSet::new(
        Arc::new(mock_generator()),
        Arc::new(following_stage1()),
        Arc::new(mock_stage2()),
    )
}

pub fn mock_models() -> ModelSet {
    ModelSet::new(
        Arc::new(mock_generator()),
        Arc::new(mock_stage1(-1.0)),
        Arc::new(mock_stage2()),
    )
}

pub fn loud_models() -> ModelSet {
    ModelSet::new(
        Arc::new(mock_generator()),
        Arc::new(mock_stage1(1.0)),
        Arc::new(mock_stage2()),
    )
}

/// Samples produced by `frames` spectral frames at hop 16, frame 64.
pub fn expected_samples(frames: usize) -> usize {
    (frames - 1) * 16 + 64
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0, f32::max)
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}
