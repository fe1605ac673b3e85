//! Affine rescale between the dB domain and the model's numeric range.

use crate::{Error, Result};
use ndarray::{Array, Dimension};

/// `(S - mu) / sigma`, optionally clipped to `[-1, 1]`.
///
/// `mu` and `sigma` are fixed configuration constants. Without clipping,
/// [`denormalize`](Self::denormalize) inverts [`normalize`](Self::normalize)
/// to floating tolerance; clipping discards everything outside `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    mu: f32,
    sigma: f32,
}

impl Normalizer {
    pub fn new(mu: f32, sigma: f32) -> Result<Self> {
        if !mu.is_finite() || !sigma.is_finite() || sigma == 0.0 {
            return Err(Error::InvalidConfig(format!(
                "normalizer needs finite mu and non-zero sigma, got mu={} sigma={}",
                mu, sigma
            )));
        }
        Ok(Self { mu, sigma })
    }

    pub fn mu(&self) -> f32 {
        self.mu
    }

    pub fn sigma(&self) -> f32 {
        self.sigma
    }

    #[inline]
    pub fn normalize_value(&self, v: f32) -> f32 {
        (v - self.mu) / self.sigma
    }

    #[inline]
    pub fn denormalize_value(&self, v: f32) -> f32 {
        v * self.sigma + self.mu
    }

    pub fn normalize<D: Dimension>(&self, s: &Array<f32, D>, clip: bool) -> Array<f32, D> {
        if clip {
            s.mapv(|v| self.normalize_value(v).clamp(-1.0, 1.0))
        } else {
            s.mapv(|v| self.normalize_value(v))
        }
    }

    pub fn denormalize<D: Dimension>(&self, s: &Array<f32, D>, clip: bool) -> Array<f32, D> {
        if clip {
            s.mapv(|v| self.denormalize_value(v.clamp(-1.0, 1.0)))
        } else {
            s.mapv(|v| self.denormalize_value(v))
        }
    }

    /// Per-call min-max rescale into `(0, 1]`, for display only.
    pub fn normalize_rel<D: Dimension>(s: &Array<f32, D>) -> Array<f32, D> {
        const EPS: f32 = 1e-7;
        let min = s.iter().fold(f32::INFINITY, |acc, &v| acc.min(v + EPS));
        let shifted = s.mapv(|v| v - min);
        let max = shifted.iter().fold(f32::NEG_INFINITY, |acc, &v| acc.max(v + EPS));
        shifted.mapv(|v| v / (max + EPS) + EPS)
    }
}
