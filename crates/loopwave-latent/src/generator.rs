//! Anchor interpolation, centering and receptive-field cropping.

use crate::field::LatentCoordinateField;
use crate::sampling::{standard_normal_vec, truncated_normal_vec};
use crate::{Error, Result};
use loopwave_core::SynthConfig;
use ndarray::{concatenate, s, Array1, Array2, Axis};
use rand::Rng;

/// Depth of the global sub-vector shared by all anchors of one request.
pub const GLOBAL_DEPTH: usize = 64;

/// Number of quarter-phase crop offsets.
pub const CROP_PHASES: usize = 3;

/// Latent trajectory builder for a generator with a `latlen`-step window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatentFieldGenerator {
    latlen: usize,
    coordlen: usize,
    coord_depth: usize,
    crop_offsets: [usize; CROP_PHASES],
}

impl LatentFieldGenerator {
    pub fn new(latlen: usize, coordlen: usize, coord_depth: usize) -> Result<Self> {
        if latlen == 0 || latlen % 4 != 0 {
            return Err(Error::InvalidConfig(format!(
                "latlen {} must be a positive multiple of 4",
                latlen
            )));
        }
        if coord_depth == 0 {
            return Err(Error::InvalidConfig("coord_depth must be positive".into()));
        }

        let quarter = latlen / 4;
        let half = latlen / 2;
        let crop_offsets = [quarter, quarter + half, quarter + 2 * half];

        // A single window spans 2 * coordlen centered steps and the last crop
        // must fit inside it.
        let needed = crop_offsets[CROP_PHASES - 1] + latlen;
        if coordlen < latlen || 2 * coordlen < needed {
            return Err(Error::InvalidConfig(format!(
                "coordlen {} too short for latlen {} (needs >= {})",
                coordlen,
                latlen,
                latlen.max(needed.div_ceil(2))
            )));
        }

        Ok(Self {
            latlen,
            coordlen,
            coord_depth,
            crop_offsets,
        })
    }

    pub fn from_config(config: &SynthConfig) -> Result<Self> {
        Self::new(config.latlen, config.coordlen, config.coord_depth)
    }

    pub fn latlen(&self) -> usize {
        self.latlen
    }

    pub fn coordlen(&self) -> usize {
        self.coordlen
    }

    pub fn coord_depth(&self) -> usize {
        self.coord_depth
    }

    /// Anchor dimension: `coord_depth + GLOBAL_DEPTH`.
    pub fn depth(&self) -> usize {
        self.coord_depth + GLOBAL_DEPTH
    }

    pub fn crop_offsets(&self) -> &[usize; CROP_PHASES] {
        &self.crop_offsets
    }

    /// Anchors needed so `fac` windows fit after centering and trimming.
    pub fn multi_anchor_count(&self, fac: usize) -> usize {
        let ratio = self.coordlen / self.latlen;
        3 + fac.saturating_sub(1).div_ceil(ratio)
    }

    /// One `[latlen, depth]` window cropped from a three-anchor trajectory.
    ///
    /// Anchors are drawn from an untruncated standard normal.
    pub fn sample_window<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Array2<f32>> {
        let global = standard_normal_vec(rng, GLOBAL_DEPTH);
        let anchors: Vec<Array1<f32>> = (0..3)
            .map(|_| join_anchor(standard_normal_vec(rng, self.coord_depth), &global))
            .collect::<Result<_>>()?;

        let trajectory = center(&interpolate(&anchors, self.coordlen));
        let phase = rng.gen_range(0..CROP_PHASES);
        let start = self.crop_offsets[phase];
        tracing::debug!("Cropping window at phase {} (offset {})", phase, start);
        Ok(trajectory
            .slice(s![start..start + self.latlen, ..])
            .to_owned())
    }

    /// `fac` consecutive windows from `3 + ceil((fac - 1) / ratio)` anchors,
    /// `ratio = coordlen / latlen`.
    pub fn build_latent_field_multi<R: Rng + ?Sized>(
        &self,
        fac: usize,
        truncation: f32,
        rng: &mut R,
    ) -> Result<LatentCoordinateField> {
        check_block_count(fac)?;
        let global = truncated_normal_vec(rng, GLOBAL_DEPTH, truncation)?;
        let count = self.multi_anchor_count(fac);
        let mut anchors = Vec::with_capacity(count);
        for _ in 0..count {
            let local = truncated_normal_vec(rng, self.coord_depth, truncation)?;
            anchors.push(join_anchor(local, &global)?);
        }

        tracing::debug!(
            "Building {}-block latent field from {} anchors",
            fac,
            count
        );
        let trajectory = center(&interpolate(&anchors, self.coordlen));
        self.take_windows(trajectory, self.latlen / 4, fac)
    }

    /// `fac` windows tracing two anchors back and forth. The first and last
    /// steps of the result coincide.
    pub fn build_latent_field_loop<R: Rng + ?Sized>(
        &self,
        fac: usize,
        truncation: f32,
        rng: &mut R,
    ) -> Result<LatentCoordinateField> {
        check_block_count(fac)?;
        let global = truncated_normal_vec(rng, GLOBAL_DEPTH, truncation)?;
        let a = join_anchor(truncated_normal_vec(rng, self.coord_depth, truncation)?, &global)?;
        let b = join_anchor(truncated_normal_vec(rng, self.coord_depth, truncation)?, &global)?;

        let mut anchors = Vec::with_capacity(2 * (fac + 2));
        for _ in 0..fac + 2 {
            anchors.push(a.clone());
            anchors.push(b.clone());
        }

        tracing::debug!("Building {}-block loop field", fac);
        let trajectory = center(&interpolate(&anchors, self.latlen / 2));
        self.take_windows(trajectory, self.latlen / 2, fac)
    }

    fn take_windows(&self, trajectory: Array2<f32>, skip: usize, fac: usize) -> Result<LatentCoordinateField> {
        let needed = skip + fac * self.latlen;
        if trajectory.nrows() < needed {
            return Err(Error::Shape(format!(
                "trajectory of {} steps is shorter than the {} needed",
                trajectory.nrows(),
                needed
            )));
        }
        let windows = trajectory.slice(s![skip..needed, ..]).to_owned();
        LatentCoordinateField::from_timeline(windows, self.latlen)
    }
}

fn check_block_count(fac: usize) -> Result<()> {
    if fac == 0 {
        return Err(Error::InvalidRequest("block count must be at least 1".into()));
    }
    Ok(())
}

fn join_anchor(local: Array1<f32>, global: &Array1<f32>) -> Result<Array1<f32>> {
    Ok(concatenate(Axis(0), &[local.view(), global.view()])?)
}

/// Linear segments of `steps` rows between consecutive anchors. Each segment
/// omits its end point except the last, giving `(K - 1) * steps + 1` rows.
fn interpolate(anchors: &[Array1<f32>], steps: usize) -> Array2<f32> {
    let depth = anchors.first().map_or(0, |a| a.len());
    let segments = anchors.len().saturating_sub(1);
    let rows = segments * steps + usize::from(!anchors.is_empty());
    let mut out = Array2::<f32>::zeros((rows, depth));

    for (k, pair) in anchors.windows(2).enumerate() {
        let (from, to) = (&pair[0], &pair[1]);
        for i in 0..steps {
            let t = i as f32 / steps as f32;
            let mut row = out.row_mut(k * steps + i);
            for ((dst, &x0), &x1) in row.iter_mut().zip(from).zip(to) {
                *dst = x0 + (x1 - x0) * t;
            }
        }
    }
    if let Some(last) = anchors.last() {
        out.row_mut(rows - 1).assign(last);
    }
    out
}

/// Average each step with its successor; one step shorter than the input.
fn center(x: &Array2<f32>) -> Array2<f32> {
    let rows = x.nrows().saturating_sub(1);
    Array2::from_shape_fn((rows, x.ncols()), |(t, d)| 0.5 * (x[[t, d]] + x[[t + 1, d]]))
}
