//! Normal and truncated-normal sampling from an explicit generator.

use crate::{Error, Result};
use ndarray::Array1;
use rand::Rng;
use rand_distr::StandardNormal;

/// One draw from N(0, 1) restricted to `[-bound, bound]`, by rejection.
pub fn truncated_normal<R: Rng + ?Sized>(rng: &mut R, bound: f32) -> Result<f32> {
    check_bound(bound)?;
    loop {
        let x: f32 = rng.sample(StandardNormal);
        if x.abs() <= bound {
            return Ok(x);
        }
    }
}

pub fn truncated_normal_vec<R: Rng + ?Sized>(rng: &mut R, len: usize, bound: f32) -> Result<Array1<f32>> {
    check_bound(bound)?;
    let mut values = Vec::with_capacity(len);
    for _ in 0..len {
        values.push(truncated_normal(rng, bound)?);
    }
    Ok(Array1::from_vec(values))
}

pub fn standard_normal_vec<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Array1<f32> {
    (0..len).map(|_| rng.sample::<f32, _>(StandardNormal)).collect()
}

fn check_bound(bound: f32) -> Result<()> {
    if !bound.is_finite() || bound <= 0.0 {
        return Err(Error::InvalidRequest(format!(
            "truncation bound must be finite and positive, got {}",
            bound
        )));
    }
    Ok(())
}
