//! Decibel conversions.
//!
//! Floors are applied before every logarithm, so zeros and NaNs map to the
//! floor value instead of propagating `-inf`/NaN.

use ndarray::{Array, Array3, Axis, Dimension};

/// Power floor used by [`power_to_db`].
pub const AMIN: f32 = 1e-10;

/// Amplitude floor used by [`amp_to_db`].
const AMP_FLOOR: f32 = 1e-5;

/// `20 * log10(clip(|x|, 1e-5, f32::MAX))`
#[inline]
pub fn amp_to_db(x: f32) -> f32 {
    20.0 * x.abs().max(AMP_FLOOR).min(f32::MAX).log10()
}

/// `10^(0.05 * x)`
#[inline]
pub fn db_to_amp(x: f32) -> f32 {
    10.0f32.powf(0.05 * x)
}

/// `reference * 10^(0.1 * x)`
#[inline]
pub fn db_to_power(x: f32, reference: f32) -> f32 {
    reference * 10.0f32.powf(0.1 * x)
}

#[inline]
fn floored_db(power: f32, amin: f32) -> f32 {
    10.0 * amin.max(power).log10()
}

/// Power to dB relative to `reference`.
///
/// With `top_db`, values more than `top_db` below the global maximum are
/// raised to that limit.
pub fn power_to_db<D: Dimension>(
    power: &Array<f32, D>,
    reference: f32,
    amin: f32,
    top_db: Option<f32>,
) -> Array<f32, D> {
    let offset = floored_db(reference, amin);
    let mut log_spec = power.mapv(|p| floored_db(p, amin) - offset);
    if let Some(top_db) = top_db {
        let limit = max_value(log_spec.iter()) - top_db;
        log_spec.mapv_inplace(|v| v.max(limit));
    }
    log_spec
}

/// [`power_to_db`] over a batch `[rows, time, bins]`, clipping each row
/// against its own maximum.
pub fn power_to_db_batch(
    power: &Array3<f32>,
    reference: f32,
    amin: f32,
    top_db: Option<f32>,
) -> Array3<f32> {
    let mut log_spec = power_to_db(power, reference, amin, None);
    if let Some(top_db) = top_db {
        for mut row in log_spec.axis_iter_mut(Axis(0)) {
            let limit = max_value(row.iter()) - top_db;
            row.mapv_inplace(|v| v.max(limit));
        }
    }
    log_spec
}

fn max_value<'a>(values: impl Iterator<Item = &'a f32>) -> f32 {
    values.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v))
}
